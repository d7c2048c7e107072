//! Terminal client execution logic.
//!
//! Reads slash commands with rustyline on a blocking thread and prints store
//! changes and connection status as they happen.

use std::{path::PathBuf, sync::Arc};

use kibun_shared::{protocol::StatusRequest, time::SystemClock};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{broadcast, mpsc};

use crate::{
    api::ApiClient,
    command::{Command, OrderedList},
    config::ClientConfig,
    formatter::PresenceFormatter,
    model::{GroupId, UserId},
    session::PresenceClient,
    storage::Preferences,
    store::{GroupStore, StoreChange},
    transport::DefaultConnector,
    ui::print_with_prompt,
};

/// Everything the terminal client needs to start
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub user_id: UserId,
    pub token: String,
    pub config: ClientConfig,
    pub preferences_path: Option<PathBuf>,
    pub group: Option<GroupId>,
}

/// Run the terminal client until the user quits
pub async fn run_client(options: ClientOptions) -> Result<(), Box<dyn std::error::Error>> {
    let ClientOptions {
        user_id,
        token,
        config,
        preferences_path,
        group,
    } = options;

    config.validate()?;

    let preferences = match preferences_path {
        Some(path) => Preferences::open(path).await?,
        None => Preferences::in_memory(),
    };
    let api = ApiClient::new(&config, token.as_str());
    tracing::info!(
        "Using endpoint {} (transports {:?})",
        config.endpoint,
        config.transports
    );

    let client = PresenceClient::new(
        user_id.clone(),
        config,
        Arc::new(DefaultConnector::new()),
        preferences,
        Arc::new(SystemClock),
    );

    match group {
        Some(group_id) => client.select_group(group_id).await?,
        None => {
            if let Some(group_id) = client.restore_selected_group().await? {
                tracing::info!("Restored selected group '{}'", group_id);
            }
        }
    }

    client.connect(&token);

    let prompt = user_id.to_string();
    println!(
        "\nYou are '{}'. Type /help for commands. Press Ctrl+C to exit.\n",
        user_id
    );

    let mut input_rx = spawn_readline(prompt.clone());
    let mut changes = client.store().subscribe();
    let mut status = client.status();

    loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = execute(&client, &api, command).await {
                            print_with_prompt(&format!("\n! {}\n", e), &prompt);
                        }
                    }
                    Err(e) => print_with_prompt(&format!("\n! {}\n", e), &prompt),
                }
            }

            change = changes.recv() => match change {
                Ok(change) => print_change(&change, client.user_id(), &prompt),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Display lagged behind by {} store changes", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                let text = PresenceFormatter::format_connection_status(&current);
                print_with_prompt(&text, &prompt);
            }
        }
    }

    client.connection().disconnect().await;
    tracing::info!("Client session ended normally");
    Ok(())
}

/// Spawn a blocking thread for rustyline (synchronous readline)
fn spawn_readline(prompt: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", prompt);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}

async fn execute(
    client: &PresenceClient,
    api: &ApiClient,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    let prompt = client.user_id().to_string();

    match command {
        Command::Join(group_id) => client.select_group(group_id).await?,
        Command::Leave => match client.leave_selected_group().await? {
            Some(group_id) => print_with_prompt(&format!("\nLeft {}\n", group_id), &prompt),
            None => print_with_prompt("\nNo group selected\n", &prompt),
        },
        Command::Status { text, emoji } => {
            let group_id = selected(client)?;
            let request = StatusRequest {
                text,
                emoji,
                mood: None,
            };
            api.post_status(&group_id, &request).await?;
        }
        Command::Mood { mood, text } => {
            let group_id = selected(client)?;
            let request = StatusRequest {
                text: text.unwrap_or_default(),
                emoji: None,
                mood: Some(mood),
            };
            api.post_status(&group_id, &request).await?;
        }
        Command::Members => {
            let group_id = selected(client)?;
            let mut members = client.store().members_of(&group_id).await;
            if members.is_empty() {
                members = api.members(&group_id).await?;
                client
                    .store()
                    .update_group_members(&group_id, members.clone())
                    .await;
            }
            let text = PresenceFormatter::format_members(&group_id, &members, client.user_id());
            print_with_prompt(&text, &prompt);
        }
        Command::Show => {
            let group_id = selected(client)?;
            let statuses = client.statuses_in_order(&group_id).await;
            let text = PresenceFormatter::format_statuses(&group_id, &statuses, client.user_id());
            print_with_prompt(&text, &prompt);
        }
        Command::Moods => {
            let group_id = selected(client)?;
            let moods = client.moods_in_order(&group_id).await;
            let text = PresenceFormatter::format_moods(&group_id, &moods);
            print_with_prompt(&text, &prompt);
        }
        Command::Order { list, users } => {
            let preferences = client.preferences();
            match list {
                OrderedList::Status => {
                    preferences
                        .set_status_order(client.user_id(), &users)
                        .await?
                }
                OrderedList::Mood => preferences.set_mood_order(client.user_id(), &users).await?,
            }
            print_with_prompt(&format!("\nSaved {:?} order\n", list), &prompt);
        }
        Command::Groups => {
            let groups = api.groups().await?;
            let known = groups
                .iter()
                .filter_map(|group| GroupId::new(group.group_id.as_str()).ok())
                .collect();
            client.store().set_known_groups(known).await;

            let mut text = String::from("\n");
            for group in &groups {
                text.push_str(&format!(
                    "{} {} ({} members)\n",
                    group.group_id,
                    group.name.as_deref().unwrap_or(""),
                    group.member_count
                ));
            }
            print_with_prompt(&text, &prompt);
        }
        Command::Help => print_with_prompt(&PresenceFormatter::format_help(), &prompt),
        Command::Quit => {}
    }

    Ok(())
}

fn selected(client: &PresenceClient) -> Result<GroupId, String> {
    client
        .selected_group()
        .ok_or_else(|| "No group selected; use /join <group>".to_string())
}

fn print_change(change: &StoreChange, me: &UserId, prompt: &str) {
    let text = match change {
        StoreChange::Status(record) => PresenceFormatter::format_status(record, me),
        StoreChange::Mood(record) => PresenceFormatter::format_mood(record),
        StoreChange::Members { group_id, count } => {
            format!("{} now has {} members\n", group_id, count)
        }
        StoreChange::KnownGroups(_) | StoreChange::Cleared => return,
    };
    print_with_prompt(&format!("\n{}", text), prompt);
}
