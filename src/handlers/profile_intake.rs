use crate::error::ValidationFailure;
use crate::models::UserProfile;

/// Raw text of the three intake fields, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub age: String,
    pub weight: String,
    pub height: String,
}

impl ProfileForm {
    pub fn new(age: impl Into<String>, weight: impl Into<String>, height: impl Into<String>) -> Self {
        Self {
            age: age.into(),
            weight: weight.into(),
            height: height.into(),
        }
    }

    /// Validates all three fields at once. A rejected form yields no profile.
    pub fn submit(&self) -> Result<UserProfile, ValidationFailure> {
        let age = parse_age(&self.age);
        let weight = parse_measure(&self.weight);
        let height = parse_measure(&self.height);

        match (age, weight, height) {
            (Some(age), Some(weight), Some(height)) => {
                log::info!("👤 Profile accepted: age={}, weight={}kg, height={}cm", age, weight, height);
                Ok(UserProfile { age, weight, height })
            }
            _ => {
                log::warn!(
                    "⚠️ Profile rejected: age='{}', weight='{}', height='{}'",
                    self.age,
                    self.weight,
                    self.height
                );
                Err(ValidationFailure::new())
            }
        }
    }
}

fn parse_age(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|age| *age > 0)
}

fn parse_measure(value: &str) -> Option<f64> {
    // Accept a comma as decimal separator (70,5)
    let cleaned = value.trim().replace(',', ".");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}
