//! Reminder text shared by every channel.

use quiet_db::models::quiet_hour::QuietHour;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Rendered reminder for one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub subject: String,
    pub body: String,
}

impl Reminder {
    pub fn for_window(window: &QuietHour) -> Self {
        let subject = format!("Quiet hour starting soon: {}", window.title);

        let mut body = format!(
            "Your quiet hour \"{}\" is about to start.\n\n\
             Start: {}\n\
             End: {}\n\
             Duration: {} minutes\n",
            window.title,
            window.start_time.format(TIME_FORMAT),
            window.end_time.format(TIME_FORMAT),
            window.duration_minutes(),
        );
        if !window.description.is_empty() {
            body.push_str(&format!("Description: {}\n", window.description));
        }
        body.push_str("\nThis is an automated reminder from Quiet Hours Scheduler.\n");

        Self { subject, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window(description: &str) -> QuietHour {
        let start = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        QuietHour {
            id: 1,
            user_id: 1,
            title: "Deep work".into(),
            description: description.into(),
            start_time: start,
            end_time: start + chrono::Duration::minutes(90),
            is_active: true,
            is_notified: false,
            notified_at: None,
            claim_token: None,
            claimed_at: None,
            delivery_attempts: 0,
            last_delivery_error: None,
            delivery_failed_at: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn subject_names_the_window() {
        assert_eq!(
            Reminder::for_window(&window("")).subject,
            "Quiet hour starting soon: Deep work"
        );
    }

    #[test]
    fn body_lists_times_and_duration() {
        let body = Reminder::for_window(&window("")).body;
        assert!(body.contains("Start: 2025-03-14 09:00 UTC"));
        assert!(body.contains("End: 2025-03-14 10:30 UTC"));
        assert!(body.contains("Duration: 90 minutes"));
        assert!(!body.contains("Description:"));
    }

    #[test]
    fn body_includes_description_when_present() {
        let body = Reminder::for_window(&window("Chapter 4 proofs")).body;
        assert!(body.contains("Description: Chapter 4 proofs"));
    }
}
