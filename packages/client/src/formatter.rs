//! Text formatting for the terminal client.

use kibun_shared::time::millis_to_rfc3339;

use crate::{
    config::TransportKind,
    model::{GroupId, Member, MoodRecord, StatusRecord, UserId},
    session::ConnectionStatus,
};

const RULE: &str = "============================================================";

/// Presence formatter for terminal display
pub struct PresenceFormatter;

impl PresenceFormatter {
    /// Format the notice shown when a session is established
    ///
    /// # Arguments
    ///
    /// * `session_id` - Server-assigned session id
    /// * `transport` - Transport the session runs on
    pub fn format_connected(session_id: &str, transport: TransportKind) -> String {
        format!("\n* connected (session {}, {})\n", session_id, transport)
    }

    /// Format any connection status change
    pub fn format_connection_status(status: &ConnectionStatus) -> String {
        match status {
            ConnectionStatus::Connected {
                session_id,
                transport,
            } => Self::format_connected(session_id, *transport),
            ConnectionStatus::Interrupted { reason } => {
                format!("\n! connection interrupted: {}\n", reason)
            }
            ConnectionStatus::Disconnected => "\n* disconnected\n".to_string(),
        }
    }

    /// Format one status line
    ///
    /// # Arguments
    ///
    /// * `record` - The status to show
    /// * `me` - The current user (marked with "(me)")
    pub fn format_status(record: &StatusRecord, me: &UserId) -> String {
        let me_suffix = if &record.user_id == me { " (me)" } else { "" };
        let emoji = record
            .emoji
            .as_deref()
            .map(|emoji| format!("{} ", emoji))
            .unwrap_or_default();
        let mood = record
            .mood
            .as_deref()
            .map(|mood| format!(" [{}]", mood))
            .unwrap_or_default();
        format!(
            "{}{}: {}{}{} - updated at {}\n",
            record.user_id,
            me_suffix,
            emoji,
            record.text,
            mood,
            millis_to_rfc3339(record.updated_at)
        )
    }

    pub fn format_mood(record: &MoodRecord) -> String {
        format!(
            "{} feels {} - updated at {}\n",
            record.user_id,
            record.mood,
            millis_to_rfc3339(record.updated_at)
        )
    }

    /// Format the member list of a group
    pub fn format_members(group_id: &GroupId, members: &[Member], me: &UserId) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\n", RULE));
        output.push_str(&format!("Members of {}:\n", group_id));

        if members.is_empty() {
            output.push_str("(No members)\n");
        } else {
            for member in members {
                let me_suffix = if &member.user_id == me { " (me)" } else { "" };
                output.push_str(&format!("{}{}\n", member.label(), me_suffix));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format every status of a group, in display order
    pub fn format_statuses(group_id: &GroupId, statuses: &[StatusRecord], me: &UserId) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\n", RULE));
        output.push_str(&format!("Statuses in {}:\n", group_id));

        if statuses.is_empty() {
            output.push_str("(No statuses yet)\n");
        } else {
            for record in statuses {
                output.push_str(&Self::format_status(record, me));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format every mood of a group, in display order
    pub fn format_moods(group_id: &GroupId, moods: &[MoodRecord]) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\n", RULE));
        output.push_str(&format!("Moods in {}:\n", group_id));

        if moods.is_empty() {
            output.push_str("(No moods yet)\n");
        } else {
            for record in moods {
                output.push_str(&Self::format_mood(record));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    pub fn format_help() -> String {
        [
            "Commands:",
            "  /join <group>           select a group and join its room",
            "  /leave                  leave the selected group",
            "  /status <text> [emoji]  publish a status to the selected group",
            "  /mood <mood> [text]     publish a mood to the selected group",
            "  /members                show members of the selected group",
            "  /show                   show statuses of the selected group",
            "  /moods                  show moods of the selected group",
            "  /order status|mood <user>...",
            "                          save the display order of a list",
            "  /groups                 list groups known to the server",
            "  /quit                   disconnect and exit",
            "",
        ]
        .join("\n")
    }
}
