use clap::{Args, Subcommand};
use std::io::{self, Write};

use mydictionary_core::{AppContext, StorageType, Word, WordPatch};

use super::{first, report_failures, CommandError, OutputFormat};

#[derive(Args)]
pub struct WordCommand {
    #[command(subcommand)]
    pub command: WordSubcommand,
}

#[derive(Subcommand)]
pub enum WordSubcommand {
    /// List stored words
    List {
        /// Storage tier(s) to read: memory, durable or all
        #[arg(long, short, default_value = "durable")]
        storage: StorageType,

        /// Only words from this course
        #[arg(long)]
        course: Option<i64>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a word's details
    Show {
        /// Word ID
        id: i64,

        /// Storage tier(s) to read: memory, durable or all
        #[arg(long, short, default_value = "durable")]
        storage: StorageType,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a word's text or description
    Update {
        /// Word ID
        id: i64,

        /// New text
        #[arg(long)]
        text: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// Storage tier(s) to write: memory, durable or all
        #[arg(long, short, default_value = "durable")]
        storage: StorageType,
    },

    /// Delete a word
    Delete {
        /// Word ID
        id: i64,

        /// Storage tier(s) to write: memory, durable or all
        #[arg(long, short, default_value = "durable")]
        storage: StorageType,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Count stored words per tier
    Count {
        /// Storage tier(s) to count: memory, durable or all
        #[arg(long, short, default_value = "all")]
        storage: StorageType,
    },
}

impl WordCommand {
    pub async fn run(&self, context: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
        if touches_memory(self.storage()) {
            context.words.warm_memory().await?;
        }

        match &self.command {
            WordSubcommand::List {
                storage,
                course,
                format,
            } => {
                for tier in context.words.read_all(*storage).await {
                    let words: Vec<Word> = tier
                        .result?
                        .into_iter()
                        .filter(|w| course.map_or(true, |c| w.course_id == c))
                        .collect();

                    match format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&words)?);
                        }
                        OutputFormat::Text => {
                            if *storage == StorageType::All {
                                println!("[{}]", tier.storage_type);
                            }
                            print_word_table(&words);
                        }
                    }
                }
                Ok(())
            }

            WordSubcommand::Show {
                id,
                storage,
                format,
            } => {
                for tier in context.words.read(*id, *storage).await {
                    let word = tier.result?;
                    match format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&word)?);
                        }
                        OutputFormat::Text => {
                            if *storage == StorageType::All {
                                println!("[{}]", tier.storage_type);
                            }
                            println!("{}", word);
                        }
                    }
                }
                Ok(())
            }

            WordSubcommand::Update {
                id,
                text,
                description,
                storage,
            } => {
                if text.is_none() && description.is_none() {
                    return Err("Nothing to update. Pass --text and/or --description".into());
                }

                let current = first(context.words.read(*id, *storage).await)?;
                let patch = WordPatch {
                    text: text.clone().unwrap_or(current.text),
                    description: description.clone().unwrap_or(current.description),
                };

                let results = context.words.update(*id, patch, *storage).await;
                if !report_failures("update", &results) {
                    return Err(format!("Word {} was not updated everywhere", id).into());
                }

                let updated = first(results)?;
                println!("Updated word:");
                println!("{}", updated);
                Ok(())
            }

            WordSubcommand::Delete { id, storage, force } => {
                let word = first(context.words.read(*id, *storage).await)?;

                if !force {
                    print!("Delete word '{}'? [y/N] ", word.text);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                let results = context.words.delete(*id, *storage).await;
                if !report_failures("delete", &results) {
                    return Err(format!("Word {} was not deleted everywhere", id).into());
                }

                println!("Deleted word: {}", word.text);
                Ok(())
            }

            WordSubcommand::Count { storage } => {
                let results = context.words.count(*storage).await;
                if results.is_empty() {
                    return Err(CommandError::NoStorageSelected.into());
                }
                for tier in results {
                    match tier.result {
                        Ok(count) => println!("{:<8}  {}", tier.storage_type, count),
                        Err(e) => println!("{:<8}  error: {}", tier.storage_type, e),
                    }
                }
                Ok(())
            }
        }
    }

    fn storage(&self) -> StorageType {
        match &self.command {
            WordSubcommand::List { storage, .. }
            | WordSubcommand::Show { storage, .. }
            | WordSubcommand::Update { storage, .. }
            | WordSubcommand::Delete { storage, .. }
            | WordSubcommand::Count { storage } => *storage,
        }
    }
}

fn touches_memory(storage: StorageType) -> bool {
    matches!(storage, StorageType::Memory | StorageType::All)
}

fn print_word_table(words: &[Word]) {
    if words.is_empty() {
        println!("No words found");
        return;
    }

    println!("{:<8}  {:<8}  {:<24}  DESCRIPTION", "ID", "COURSE", "TEXT");
    println!("{}", "-".repeat(80));
    for word in words {
        println!(
            "{:<8}  {:<8}  {:<24}  {}",
            word.id,
            word.course_id,
            truncate(&word.text, 24),
            truncate(&word.description, 34)
        );
    }
    println!("\nTotal: {} word(s)", words.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer word", 10), "a much ...");
        assert_eq!(truncate("ñññññññññññ", 6), "ñññ...");
    }

    #[test]
    fn test_touches_memory() {
        assert!(touches_memory(StorageType::Memory));
        assert!(touches_memory(StorageType::All));
        assert!(!touches_memory(StorageType::Durable));
        assert!(!touches_memory(StorageType::None));
    }
}
