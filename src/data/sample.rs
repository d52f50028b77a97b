use crate::data::loader::RawTable;

pub const SAMPLE_ROWS: usize = 20;

/// (text, category, urgency)
const SAMPLE: [(&str, &str, &str); SAMPLE_ROWS] = [
    ("Laptop won't boot, black screen, fans spin", "hardware", "high"),
    ("Cannot login to email, password not accepted", "account", "high"),
    ("VPN connection drops intermittently", "network", "medium"),
    ("Application crashes on save with stacktrace error", "software", "high"),
    ("Mouse not recognized after Windows update", "hardware", "medium"),
    ("Request to install Photoshop for designer", "software", "low"),
    ("Disk health warning, SMART reported failing sectors", "hardware", "high"),
    ("Slow internet speed on floor 3", "network", "medium"),
    ("Printer not responding to print jobs", "hardware", "medium"),
    ("Database connection timeout errors", "software", "high"),
    ("WiFi keeps disconnecting from network", "network", "medium"),
    ("Software license expired notification", "software", "low"),
    ("Hard drive making clicking noises", "hardware", "high"),
    ("Cannot access shared network drive", "network", "medium"),
    ("Application freezes when opening large files", "software", "medium"),
    ("Monitor display flickering intermittently", "hardware", "medium"),
    ("Email server not responding", "network", "high"),
    ("Router needs firmware update", "network", "low"),
    ("Software installation failed with error code", "software", "medium"),
    ("Keyboard keys not responding properly", "hardware", "low"),
];

/// Small bundled table for demos and tests
pub fn sample_table() -> RawTable {
    let headers = vec![
        "text".to_string(),
        "category".to_string(),
        "urgency".to_string(),
    ];
    let rows = SAMPLE
        .iter()
        .map(|(text, category, urgency)| {
            vec![
                Some(text.to_string()),
                Some(category.to_string()),
                Some(urgency.to_string()),
            ]
        })
        .collect();

    RawTable::new(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_table_shape() {
        let table = sample_table();
        assert_eq!(table.len(), SAMPLE_ROWS);
        assert_eq!(table.cell(0, 1), Some("hardware"));
        assert_eq!(table.cell(19, 2), Some("low"));
    }
}
