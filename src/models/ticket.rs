use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A support ticket as seen by the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Free text (title and body already joined)
    pub text: String,

    /// Department recorded in training data
    pub declared_department: Option<String>,

    /// Urgency recorded in training data
    pub declared_urgency: Option<String>,
}

impl Ticket {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            declared_department: None,
            declared_urgency: None,
        }
    }

    /// Join an optional title and a message the way training text is built
    pub fn from_parts(title: Option<&str>, message: &str) -> Self {
        let text = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => format!("{title} {message}"),
            None => message.to_string(),
        };
        Self::new(text.trim())
    }

    /// Convert to a labelled training row when both labels are present
    pub fn into_training_record(self) -> Option<TrainingRecord> {
        Some(TrainingRecord {
            category: self.declared_department?,
            urgency: self.declared_urgency?,
            text: self.text,
        })
    }
}

/// One cleaned training row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub text: String,
    pub category: String,
    pub urgency: String,
}

/// Support department (ticket type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Hardware,
    Software,
    Network,
    Account,
    Other,
}

impl Department {
    pub const ALL: [Department; 5] = [
        Department::Hardware,
        Department::Software,
        Department::Network,
        Department::Account,
        Department::Other,
    ];

    /// Case-insensitive lookup; anything unrecognized is `Other`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "hardware" => Department::Hardware,
            "software" => Department::Software,
            "network" => Department::Network,
            "account" => Department::Account,
            _ => Department::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Hardware => "hardware",
            Department::Software => "software",
            Department::Network => "network",
            Department::Account => "account",
            Department::Other => "other",
        }
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket urgency (priority)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    /// Case-insensitive lookup; `critical` folds into `high`, anything else unknown is `medium`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" => Urgency::Low,
            "high" | "critical" => Urgency::High,
            _ => Urgency::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the dual classifier for one ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketPrediction {
    /// Predicted department label
    #[serde(rename = "type")]
    pub ticket_type: String,

    /// Predicted urgency label
    pub urgency: String,

    pub confidence_type: f64,
    pub confidence_urgency: f64,

    pub type_probabilities: BTreeMap<String, f64>,
    pub urgency_probabilities: BTreeMap<String, f64>,
}

/// Portal-facing classification: department and priority only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub department: String,
    pub priority: String,
    pub confidence_type: f64,
    pub confidence_urgency: f64,
}

impl Classification {
    /// Answer for blank tickets, given without consulting any model
    pub fn empty_default() -> Self {
        Self {
            department: Department::Other.to_string(),
            priority: Urgency::Medium.to_string(),
            confidence_type: 0.0,
            confidence_urgency: 0.0,
        }
    }
}

impl From<TicketPrediction> for Classification {
    fn from(prediction: TicketPrediction) -> Self {
        Self {
            department: prediction.ticket_type.to_lowercase(),
            priority: prediction.urgency.to_lowercase(),
            confidence_type: prediction.confidence_type,
            confidence_urgency: prediction.confidence_urgency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_default_classification() {
        let c = Classification::empty_default();
        assert_eq!(c.department, "other");
        assert_eq!(c.priority, "medium");
        assert_eq!(c.confidence_type, 0.0);
    }

    #[test]
    fn test_department_from_label() {
        assert_eq!(Department::from_label(" Hardware "), Department::Hardware);
        assert_eq!(Department::from_label("billing"), Department::Other);
        assert_eq!(Department::Network.to_string(), "network");
    }

    #[test]
    fn test_urgency_from_label() {
        assert_eq!(Urgency::from_label("CRITICAL"), Urgency::High);
        assert_eq!(Urgency::from_label("low"), Urgency::Low);
        assert_eq!(Urgency::from_label("urgent-ish"), Urgency::Medium);
    }

    #[test]
    fn test_ticket_from_parts() {
        assert_eq!(
            Ticket::from_parts(Some("VPN down"), "cannot connect").text,
            "VPN down cannot connect"
        );
        assert_eq!(Ticket::from_parts(Some("  "), " body ").text, "body");
        assert_eq!(Ticket::from_parts(None, "").text, "");
    }

    #[test]
    fn test_into_training_record_requires_labels() {
        let mut ticket = Ticket::new("Printer jammed");
        assert!(ticket.clone().into_training_record().is_none());

        ticket.declared_department = Some("hardware".into());
        ticket.declared_urgency = Some("low".into());
        let record = ticket.into_training_record().unwrap();
        assert_eq!(record.category, "hardware");
    }

    #[test]
    fn test_prediction_serializes_type_field() {
        let prediction = TicketPrediction {
            ticket_type: "network".into(),
            urgency: "high".into(),
            confidence_type: 0.9,
            confidence_urgency: 0.6,
            type_probabilities: BTreeMap::new(),
            urgency_probabilities: BTreeMap::new(),
        };
        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["type"], "network");
    }
}
