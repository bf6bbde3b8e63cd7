use super::{ChatRequest, Llm, LlmError};
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-attempt timeout when a schedule is configured empty.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Escalating per-attempt timeout schedule for chat-completion calls.
///
/// One attempt is made per entry; each attempt is bounded by its entry's
/// timeout. Schedules are expected to be non-decreasing so that a slow
/// response gets more room on the next try.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    timeouts: Vec<Duration>,
}

impl RetrySchedule {
    pub fn new(timeouts: Vec<Duration>) -> Self {
        if timeouts.is_empty() {
            return Self {
                timeouts: vec![Duration::from_secs(DEFAULT_TIMEOUT_SECS)],
            };
        }
        Self { timeouts }
    }

    pub fn from_secs(secs: &[u64]) -> Self {
        Self::new(secs.iter().map(|s| Duration::from_secs(*s)).collect())
    }

    /// Total number of attempts the schedule allows.
    pub fn attempts(&self) -> usize {
        self.timeouts.len()
    }

    /// Timeout for a zero-based attempt index, clamped to the last entry.
    pub fn timeout_for(&self, attempt: usize) -> Duration {
        self.timeouts[attempt.min(self.timeouts.len() - 1)]
    }
}

/// Call the chat-completion API with escalating timeouts, falling back on
/// exhaustion.
///
/// Every failure mode (transport error, API rejection, timeout, empty
/// content) is logged and retried with the next timeout in the schedule.
/// Once the schedule is exhausted the fallback value is returned; this
/// function never surfaces an error to the caller.
pub async fn chat_or_fallback(
    llm: &dyn Llm,
    request: &ChatRequest,
    schedule: &RetrySchedule,
    fallback: &str,
    task: &str,
) -> String {
    let attempts = schedule.attempts();

    for attempt in 0..attempts {
        let timeout = schedule.timeout_for(attempt);
        debug!(
            "{}: attempt {}/{} with {}s timeout ({} model)",
            task,
            attempt + 1,
            attempts,
            timeout.as_secs(),
            request.model
        );

        let outcome = match tokio::time::timeout(timeout, llm.chat(request.clone())).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(timeout)),
        };

        match outcome {
            Ok(response) => {
                let content = response.content.trim();
                if content.is_empty() {
                    warn!("{}: attempt {} returned empty content", task, attempt + 1);
                    continue;
                }
                debug!(
                    "{}: attempt {} succeeded (tokens: {:?})",
                    task,
                    attempt + 1,
                    response.tokens_used
                );
                return content.to_string();
            }
            Err(e) => {
                warn!("{}: attempt {}/{} failed: {}", task, attempt + 1, attempts, e);
                if e.is_timeout() && attempt + 1 < attempts {
                    warn!("{}: retrying with a longer timeout", task);
                }
            }
        }
    }

    warn!("{}: all {} attempts failed, using fallback", task, attempts);
    fallback.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, LlmError, LlmProvider, LlmResponse};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Scripted {
        Reply(&'static str),
        Fail,
        /// Respond after the given number of seconds (paused-clock tests).
        Slow(u64, &'static str),
    }

    struct MockLlm {
        script: Mutex<VecDeque<Scripted>>,
        calls: AtomicUsize,
    }

    impl MockLlm {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Llm for MockLlm {
        async fn chat(&self, _request: ChatRequest) -> Result<LlmResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().unwrap().pop_front();
            match step {
                Some(Scripted::Reply(text)) => Ok(LlmResponse {
                    content: text.to_string(),
                    tokens_used: Some(42),
                }),
                Some(Scripted::Slow(secs, text)) => {
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                    Ok(LlmResponse {
                        content: text.to_string(),
                        tokens_used: None,
                    })
                }
                Some(Scripted::Fail) | None => Err(LlmError::Api {
                    status: 500,
                    body: "simulated failure".to_string(),
                }),
            }
        }

        fn provider_type(&self) -> LlmProvider {
            LlmProvider::LmStudio
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage::user("hello")],
            temperature: 0.2,
        }
    }

    #[test]
    fn test_fallback_after_consecutive_failures() {
        let llm = MockLlm::new(vec![Scripted::Fail, Scripted::Fail, Scripted::Fail]);
        let schedule = RetrySchedule::from_secs(&[120, 180, 240]);

        let result = tokio_test::block_on(chat_or_fallback(
            &llm,
            &request(),
            &schedule,
            "original text",
            "refine",
        ));

        assert_eq!(result, "original text");
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_success_on_second_attempt() {
        let llm = MockLlm::new(vec![Scripted::Fail, Scripted::Reply("cleaned up")]);
        let schedule = RetrySchedule::from_secs(&[120, 180, 240]);

        let result = chat_or_fallback(&llm, &request(), &schedule, "fallback", "refine").await;

        assert_eq!(result, "cleaned up");
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_content_counts_as_failure() {
        let llm = MockLlm::new(vec![Scripted::Reply("   \n"), Scripted::Reply("ok")]);
        let schedule = RetrySchedule::from_secs(&[60, 60]);

        let result = chat_or_fallback(&llm, &request(), &schedule, "fallback", "summary").await;

        assert_eq!(result, "ok");
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalating_timeout_lets_slow_response_through() {
        // A backend that consistently takes 200s fails the 120s and 180s
        // attempts but fits inside the 240s one.
        let llm = MockLlm::new(vec![
            Scripted::Slow(200, "late"),
            Scripted::Slow(200, "late"),
            Scripted::Slow(200, "finally"),
        ]);
        let schedule = RetrySchedule::from_secs(&[120, 180, 240]);

        let result = chat_or_fallback(&llm, &request(), &schedule, "fallback", "summary").await;

        assert_eq!(result, "finally");
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_attempts_time_out() {
        let llm = MockLlm::new(vec![
            Scripted::Slow(500, "never"),
            Scripted::Slow(500, "never"),
            Scripted::Slow(500, "never"),
        ]);
        let schedule = RetrySchedule::from_secs(&[120, 180, 240]);

        let result = chat_or_fallback(&llm, &request(), &schedule, "fallback", "summary").await;

        assert_eq!(result, "fallback");
        assert_eq!(llm.calls(), 3);
    }

    #[test]
    fn test_schedule_clamps_to_last_timeout() {
        let schedule = RetrySchedule::from_secs(&[120, 180, 240]);
        assert_eq!(schedule.timeout_for(0), Duration::from_secs(120));
        assert_eq!(schedule.timeout_for(2), Duration::from_secs(240));
        assert_eq!(schedule.timeout_for(9), Duration::from_secs(240));
    }

    #[test]
    fn test_empty_schedule_gets_default() {
        let schedule = RetrySchedule::from_secs(&[]);
        assert_eq!(schedule.attempts(), 1);
        assert_eq!(schedule.timeout_for(0), Duration::from_secs(60));
    }
}
