//! External predictor process launcher.
//!
//! The predictor is an opaque program: it reads the cached weather rows and
//! is expected to append one `predictions` row for the city as a side
//! effect. The runner only observes the exit status; it never writes the
//! store itself.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Predictor errors
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Failed to launch predictor: {0}")]
    Launch(#[from] std::io::Error),
    #[error("Predictor exited with status {0}")]
    ExitStatus(i32),
    #[error("Predictor timed out after {0} seconds")]
    Timeout(u64),
}

/// Something that can produce a prediction for a city as a store side
/// effect. The process-backed implementation is the production path; tests
/// substitute stubs.
#[async_trait]
pub trait Predict: Send + Sync {
    /// Run the predictor for one city. Success means the program finished
    /// with exit code 0, nothing more; whether a prediction row actually
    /// appeared is for the caller to read back.
    async fn run(&self, city: &str) -> Result<(), PredictError>;
}

/// Launches the configured external command with the lowercase city name as
/// its final argument and waits for it under a deadline.
#[derive(Debug, Clone)]
pub struct ProcessPredictor {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessPredictor {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl Predict for ProcessPredictor {
    async fn run(&self, city: &str) -> Result<(), PredictError> {
        let city_arg = city.to_lowercase();
        tracing::info!("Starting prediction process for {}", city);

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).arg(&city_arg).kill_on_drop(true);

        let status = match timeout(self.timeout, cmd.status()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    "Prediction process for {} exceeded {}s deadline",
                    city,
                    self.timeout.as_secs()
                );
                return Err(PredictError::Timeout(self.timeout.as_secs()));
            }
        };

        if status.success() {
            tracing::info!("Temperature prediction completed for {}", city);
            Ok(())
        } else {
            let code = status.code().unwrap_or(-1);
            tracing::warn!("Prediction failed for {}. Exit code: {}", city, code);
            Err(PredictError::ExitStatus(code))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let predictor = ProcessPredictor::new(
            "sh",
            vec!["-c".to_string(), "exit 0".to_string()],
            Duration::from_secs(5),
        );
        assert!(predictor.run("Chennai").await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let predictor = ProcessPredictor::new(
            "sh",
            vec!["-c".to_string(), "exit 3".to_string()],
            Duration::from_secs(5),
        );
        let result = predictor.run("Chennai").await;
        assert!(matches!(result, Err(PredictError::ExitStatus(3))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_city_name_is_lowercased() {
        // The script exits 0 only when its first argument is the lowercase
        // city name ($0 is consumed by the -c script string).
        let predictor = ProcessPredictor::new(
            "sh",
            vec![
                "-c".to_string(),
                r#"test "$1" = "chennai""#.to_string(),
                "sh".to_string(),
            ],
            Duration::from_secs(5),
        );
        assert!(predictor.run("Chennai").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_command_is_launch_failure() {
        let predictor = ProcessPredictor::new(
            "/nonexistent/skycast-predictor",
            vec![],
            Duration::from_secs(5),
        );
        let result = predictor.run("Chennai").await;
        assert!(matches!(result, Err(PredictError::Launch(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_process_hits_deadline() {
        let predictor = ProcessPredictor::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string()],
            Duration::from_millis(100),
        );
        let result = predictor.run("Chennai").await;
        assert!(matches!(result, Err(PredictError::Timeout(0))));
    }
}
