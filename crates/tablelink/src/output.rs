use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tablelink_frame::{Side, TableMode};
use tablelink_peer::{GoalEvent, Response, TableSettings};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    kind: &'static str,
    id: u8,
    command: &'a str,
    values: &'a [i64],
}

#[derive(Serialize)]
struct GoalOutput {
    kind: &'static str,
    id: u8,
    side: i64,
    side_name: &'static str,
    speed: i64,
    timestamp: String,
}

#[derive(Serialize)]
struct SettingsOutput {
    kind: &'static str,
    table_mode: i64,
    table_mode_name: &'static str,
    ai_difficulty: i64,
    ai_active: bool,
    lighting: String,
    air_speed: i64,
}

#[derive(Serialize)]
struct SummaryOutput {
    kind: &'static str,
    goals: usize,
    elapsed_ms: u128,
}

pub fn print_response(command: &str, response: &Response, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ResponseOutput {
            kind: "response",
            id: response.id,
            command,
            values: &response.values,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ID", "COMMAND", "VALUES"]);
            table.add_row(vec![
                response.id.to_string(),
                command.to_string(),
                join_values(&response.values),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "id={} command={:?} values=[{}]",
                response.id,
                command,
                join_values(&response.values)
            );
        }
        OutputFormat::Raw => println!("{}", join_values(&response.values)),
    }
}

pub fn print_goal(goal: &GoalEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&GoalOutput {
            kind: "goal",
            id: goal.id,
            side: goal.side.value(),
            side_name: side_name(goal.side),
            speed: goal.speed,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["SIDE", "SPEED"]);
            table.add_row(vec![side_name(goal.side).to_string(), goal.speed.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("goal side={} speed={}", side_name(goal.side), goal.speed);
        }
        OutputFormat::Raw => println!("{},{}", goal.side.value(), goal.speed),
    }
}

pub fn print_settings(settings: &TableSettings, format: OutputFormat) {
    let lighting = format!("#{:06X}", settings.lighting);
    match format {
        OutputFormat::Json => print_json(&SettingsOutput {
            kind: "settings",
            table_mode: settings.table_mode.value(),
            table_mode_name: mode_name(settings.table_mode),
            ai_difficulty: settings.ai_difficulty,
            ai_active: settings.ai_active,
            lighting,
            air_speed: settings.air_speed,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["SETTING", "VALUE"]);
            table
                .add_row(vec!["table mode", mode_name(settings.table_mode)])
                .add_row(vec![
                    "AI difficulty".to_string(),
                    settings.ai_difficulty.to_string(),
                ])
                .add_row(vec!["AI active".to_string(), settings.ai_active.to_string()])
                .add_row(vec!["lighting".to_string(), lighting])
                .add_row(vec![
                    "air speed".to_string(),
                    format!("{}%", settings.air_speed),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Table Settings:");
            println!("  Mode:           {}", mode_name(settings.table_mode));
            println!("  AI difficulty:  {}", settings.ai_difficulty);
            println!("  AI active:      {}", settings.ai_active);
            println!("  Lighting:       {lighting}");
            println!("  Air speed:      {}%", settings.air_speed);
        }
        OutputFormat::Raw => println!(
            "{},{},{},{},{}",
            settings.table_mode.value(),
            settings.ai_difficulty,
            u8::from(settings.ai_active),
            settings.lighting,
            settings.air_speed
        ),
    }
}

/// Closing line of a watch session. Only JSON output gets one on stdout.
pub fn print_summary(goals: usize, elapsed: std::time::Duration, format: OutputFormat) {
    if let OutputFormat::Json = format {
        print_json(&SummaryOutput {
            kind: "summary",
            goals,
            elapsed_ms: elapsed.as_millis(),
        });
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn join_values(values: &[i64]) -> String {
    values
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn side_name(side: Side) -> &'static str {
    match side {
        Side::PlayerOne => "player-one",
        Side::Ai => "ai",
    }
}

pub fn mode_name(mode: TableMode) -> &'static str {
    match mode {
        TableMode::Standard => "standard",
        TableMode::Accessibility => "accessibility",
        TableMode::Ai => "ai",
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_values_is_comma_separated() {
        assert_eq!(join_values(&[]), "");
        assert_eq!(join_values(&[1, 42]), "1,42");
    }

    #[test]
    fn response_json_shape() {
        let json = serde_json::to_value(ResponseOutput {
            kind: "response",
            id: 7,
            command: "GET; AI DIFFICULTY",
            values: &[5],
        })
        .unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["values"][0], 5);
        assert_eq!(json["command"], "GET; AI DIFFICULTY");
    }
}
