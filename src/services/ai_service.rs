use crate::error::InferenceFailure;
use crate::models::{ImagePayload, NutritionalEstimate, UserProfile};

/// Trait for nutrition estimators (Gemini, test fakes, etc.)
#[async_trait::async_trait]
pub trait NutritionEstimator: Send + Sync {
    async fn estimate(
        &self,
        image: ImagePayload,
        profile: UserProfile,
    ) -> Result<NutritionalEstimate, InferenceFailure>;
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns a fixed outcome after an optional delay and counts calls.
    pub struct FakeEstimator {
        outcome: Result<NutritionalEstimate, InferenceFailure>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeEstimator {
        pub fn succeeding(estimate: NutritionalEstimate) -> Self {
            Self {
                outcome: Ok(estimate),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(failure: InferenceFailure) -> Self {
            Self {
                outcome: Err(failure),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl NutritionEstimator for FakeEstimator {
        async fn estimate(
            &self,
            _image: ImagePayload,
            _profile: UserProfile,
        ) -> Result<NutritionalEstimate, InferenceFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.clone()
        }
    }

    /// Picks its outcome from the food name passed in the image bytes.
    pub struct EchoEstimator {
        pub delay_for: fn(&str) -> Duration,
    }

    #[async_trait::async_trait]
    impl NutritionEstimator for EchoEstimator {
        async fn estimate(
            &self,
            image: ImagePayload,
            _profile: UserProfile,
        ) -> Result<NutritionalEstimate, InferenceFailure> {
            let bytes = image
                .into_bytes()
                .map_err(|_| InferenceFailure::new(crate::error::FailureKind::Encoding))?;
            let name = String::from_utf8_lossy(&bytes).to_string();
            tokio::time::sleep((self.delay_for)(&name)).await;
            Ok(sample_estimate(&name))
        }
    }

    pub fn sample_estimate(food_name: &str) -> NutritionalEstimate {
        NutritionalEstimate {
            food_name: food_name.to_string(),
            calories: 95.0,
            protein: 0.5,
            carbohydrates: 25.0,
            grams: 182.0,
            feedback: "Ótima fonte de fibras e baixa em calorias.".to_string(),
        }
    }
}
