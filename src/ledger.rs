use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use time::{
    format_description::FormatItem, macros::format_description, Duration, OffsetDateTime,
    PrimitiveDateTime,
};

/// Fixed column header of the CSV ledger.
pub const LEDGER_HEADER: [&str; 4] = ["Date", "Category", "Amount", "Description"];

const DATE_FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Closed set of expense categories. Unknown stored values fold into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Vegetables,
    Groceries,
    Food,
    Transport,
    Rent,
    Utilities,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Vegetables => "Vegetables",
            Category::Groceries => "Groceries",
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Rent => "Rent",
            Category::Utilities => "Utilities",
            Category::Other => "Other",
        }
    }

    pub fn from_stored(value: &str) -> Self {
        match value {
            "Vegetables" => Category::Vegetables,
            "Groceries" => Category::Groceries,
            "Food" => Category::Food,
            "Transport" => Category::Transport,
            "Rent" => Category::Rent,
            "Utilities" => Category::Utilities,
            _ => Category::Other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// Capture time, wall clock, second resolution.
    pub timestamp: PrimitiveDateTime,
    pub category: Category,
    pub amount: f64,
    /// The transcribed utterance, stored verbatim.
    pub description: String,
}

impl LedgerEntry {
    pub fn new(
        timestamp: PrimitiveDateTime,
        category: Category,
        amount: f64,
        description: String,
    ) -> Self {
        Self {
            timestamp,
            category,
            amount,
            description,
        }
    }

    /// Entry timestamped with the current wall-clock time.
    pub fn captured_now(category: Category, amount: f64, description: String) -> Self {
        Self::new(local_now(), category, amount, description)
    }

    pub fn formatted_time(&self) -> String {
        self.timestamp
            .format(&DATE_FORMAT)
            .unwrap_or_else(|_| "0000-00-00 00:00:00".to_string())
    }

    fn to_record(&self) -> [String; 4] {
        [
            self.formatted_time(),
            self.category.as_str().to_string(),
            self.amount.to_string(),
            self.description.clone(),
        ]
    }

    fn from_record(record: &csv::StringRecord, row: usize) -> Result<Self> {
        let field = |idx: usize| {
            record
                .get(idx)
                .with_context(|| format!("Ledger row {row} is missing column {idx}"))
        };

        let timestamp = PrimitiveDateTime::parse(field(0)?, &DATE_FORMAT)
            .with_context(|| format!("Ledger row {row} has an unparsable date"))?;
        let category = Category::from_stored(field(1)?);
        let amount: f64 = field(2)?
            .parse()
            .with_context(|| format!("Ledger row {row} has an unparsable amount"))?;
        let description = field(3)?.to_string();

        Ok(Self::new(timestamp, category, amount, description))
    }
}

/// Current local wall-clock time (UTC fallback when the local offset is
/// unavailable, e.g. in threaded test environments).
pub fn local_now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
}

/// Append-only CSV store. Every append is a full read-modify-write of the
/// file; concurrent writers can race, which is an accepted limitation.
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates a header-only ledger file when missing. Returns true if a new
    /// file was created.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.write_all(&[])?;
        Ok(true)
    }

    pub fn load(&self) -> Result<Vec<LedgerEntry>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open ledger at {:?}", self.path))?;

        let mut entries = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result
                .with_context(|| format!("Failed to read ledger row {}", idx + 1))?;
            entries.push(LedgerEntry::from_record(&record, idx + 1)?);
        }
        Ok(entries)
    }

    /// Appends one row: reads the whole ledger, adds the entry, rewrites the
    /// file. Not atomic.
    pub fn append(&self, entry: &LedgerEntry) -> Result<()> {
        self.ensure_exists()?;
        let mut entries = self.load()?;
        entries.push(entry.clone());
        self.write_all(&entries)
    }

    /// Entries whose timestamp falls within the trailing `window` from `now`.
    pub fn recent_within(
        &self,
        window: Duration,
        now: PrimitiveDateTime,
    ) -> Result<Vec<LedgerEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let cutoff = now - window;
        Ok(self
            .load()?
            .into_iter()
            .filter(|entry| entry.timestamp >= cutoff)
            .collect())
    }

    fn write_all(&self, entries: &[LedgerEntry]) -> Result<()> {
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Failed to open ledger for writing at {:?}", self.path))?;
        writer
            .write_record(LEDGER_HEADER)
            .context("Failed to write ledger header")?;
        for entry in entries {
            writer
                .write_record(entry.to_record())
                .context("Failed to write ledger row")?;
        }
        writer.flush().context("Failed to flush ledger")?;
        Ok(())
    }
}
