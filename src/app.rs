use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dedup;
use crate::ledger::{self, LedgerEntry, LedgerStore};
use crate::parse;
use crate::speech::{AudioCapture, RecordingSession, TranscribeError, Transcriber};

/// Pause between guarded-loop captures so one press cannot double-trigger.
const CAPTURE_DEBOUNCE: Duration = Duration::from_millis(500);

type StdinLines = Lines<BufReader<Stdin>>;

/// The interactive logging loop. In guarded mode every parsed utterance is
/// checked against recent ledger rows and probable duplicates require
/// explicit confirmation before being written.
pub struct ExpenseApp {
    config: Config,
    audio_capture: AudioCapture,
    transcriber: Transcriber,
    ledger: LedgerStore,
    recording: Option<RecordingSession>,
    guarded: bool,
}

impl ExpenseApp {
    pub fn new(config: Config, guarded: bool) -> Result<Self> {
        let audio_capture =
            AudioCapture::new(config.audio_device).context("Failed to initialize audio capture")?;
        let transcriber = Transcriber::new(&config.transcription)
            .context("Failed to configure transcription service")?;

        let ledger = LedgerStore::new(config.ledger_path.clone());
        if ledger.ensure_exists()? {
            info!("Created new ledger at {:?}", ledger.path());
        }

        Ok(Self {
            config,
            audio_capture,
            transcriber,
            ledger,
            recording: None,
            guarded,
        })
    }

    /// Runs until stdin closes. Ctrl+C cancellation is handled by the caller.
    pub async fn run(&mut self) -> Result<()> {
        if self.guarded {
            info!("Piggy-bank logger started (duplicate guard on)");
        } else {
            info!("Expense logger started");
        }
        info!("Speak your expense (e.g., '10 Rs for Sabzi')");
        info!("Press Enter to start recording, Enter again to stop, Ctrl+C to exit");

        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(_)) => {
                    if let Err(err) = self.toggle_recording(&mut lines).await {
                        error!("Error handling capture: {:#}", err);
                        self.recording = None;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    error!("Error reading input: {}", err);
                    break;
                }
            }
        }

        Ok(())
    }

    async fn toggle_recording(&mut self, lines: &mut StdinLines) -> Result<()> {
        if let Some(session) = self.recording.take() {
            let samples = session.stop().context("Failed to stop recording")?;
            if samples.is_empty() {
                warn!("No audio data captured - try speaking louder");
            } else {
                self.process_utterance(samples, lines).await?;
                if self.guarded {
                    tokio::time::sleep(CAPTURE_DEBOUNCE).await;
                }
            }
            info!("Press Enter to record the next expense");
        } else {
            let session = self
                .audio_capture
                .start_recording()
                .context("Failed to start recording")?;
            self.recording = Some(session);
            info!("Listening... (press Enter to stop)");
        }
        Ok(())
    }

    async fn process_utterance(&mut self, samples: Vec<f32>, lines: &mut StdinLines) -> Result<()> {
        let sample_rate = self.audio_capture.sample_rate();
        let text = match self.transcriber.transcribe(samples, sample_rate).await {
            Ok(text) => text,
            Err(TranscribeError::Unintelligible) => {
                warn!("Could not understand audio");
                return Ok(());
            }
            Err(err @ TranscribeError::ServiceUnavailable { .. }) => {
                warn!("Could not request results; {}", err);
                return Ok(());
            }
        };

        info!("You said: {}", text);

        let Some(amount) = parse::extract_amount(&text) else {
            warn!("Could not identify amount in the speech");
            return Ok(());
        };

        if self.guarded && !duplicate_gate(&self.ledger, &self.config, &text, lines).await? {
            return Ok(());
        }

        let category = parse::extract_category(&text);
        let entry = LedgerEntry::captured_now(category, amount, text);
        self.ledger.append(&entry).context("Failed to append to ledger")?;
        info!("Logged expense: {} Rs for {}", amount, category);

        Ok(())
    }

}

/// Scans the trailing window for a probable duplicate and, when one is
/// flagged, blocks on confirmation from `lines` up to the configured
/// deadline. Returns false when the entry should be dropped: a duplicate was
/// found and the user did not confirm in time.
async fn duplicate_gate<R>(
    ledger: &LedgerStore,
    config: &Config,
    text: &str,
    lines: &mut Lines<R>,
) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    let window = time::Duration::minutes(config.duplicate_window_minutes as i64);
    let recent = ledger
        .recent_within(window, crate::ledger::local_now())
        .context("Failed to scan ledger for duplicates")?;

    let Some(found) = dedup::find_duplicate(text, &recent, config.similarity_threshold) else {
        return Ok(true);
    };

    warn!(
        "Potential duplicate entry found (similarity {:.0}%)",
        found.score * 100.0
    );
    info!("\n{}", candidate_table(found.entry));

    let timeout_secs = config.confirm_timeout_secs;
    info!(
        "Type 'y' within {} seconds to keep this entry, anything else cancels",
        timeout_secs
    );

    let deadline = Duration::from_secs(timeout_secs);
    match tokio::time::timeout(deadline, lines.next_line()).await {
        Ok(Ok(Some(line))) if line.trim().eq_ignore_ascii_case("y") => Ok(true),
        Ok(Ok(_)) => {
            info!("Entry cancelled due to possible duplicate");
            Ok(false)
        }
        Ok(Err(err)) => Err(err).context("Failed to read confirmation input"),
        Err(_) => {
            info!("No confirmation within {} seconds, entry cancelled", timeout_secs);
            Ok(false)
        }
    }
}

/// Prints ledger rows inside the duplicate window, the same view the
/// duplicate guard works from.
pub fn print_recent(config: &Config) -> Result<()> {
    let ledger = LedgerStore::new(config.ledger_path.clone());
    let window = time::Duration::minutes(config.duplicate_window_minutes as i64);
    let recent = ledger.recent_within(window, ledger::local_now())?;

    if recent.is_empty() {
        info!(
            "No ledger entries in the last {} minutes",
            config.duplicate_window_minutes
        );
        return Ok(());
    }

    let mut table = base_table();
    for entry in &recent {
        push_entry_row(&mut table, entry);
    }
    info!("\n{}", table);
    Ok(())
}

fn candidate_table(entry: &LedgerEntry) -> Table {
    let mut table = base_table();
    push_entry_row(&mut table, entry);
    table
}

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(["Time", "Amount", "Description", "Category"]);
    table
}

fn push_entry_row(table: &mut Table, entry: &LedgerEntry) {
    table.add_row([
        entry.formatted_time(),
        format!("{} Rs", entry.amount),
        entry.description.clone(),
        entry.category.to_string(),
    ]);
}
