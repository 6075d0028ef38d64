// In-memory doubles for the remote seams: a worksheet tab, a mailbox, and a
// detail scraper. They implement the real traits so the passes run unchanged.

use crate::domain::record::AuctionRecord;
use crate::mail::MessageSource;
use crate::retry::{RemoteError, RemoteErrorKind};
use crate::scraper::{DetailScraper, ScrapeOutcome};
use crate::sheets::store::{RowStore, ValueMode};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Worksheet stand-in: row 1 is the header, rows shift on insert and delete
/// exactly like the dimension operations on the real grid.
pub struct InMemoryStore {
    rows: RefCell<Vec<Vec<String>>>,
}

fn parse_cell_ref(s: &str) -> Option<(u32, usize)> {
    let split = s.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = s.split_at(split);
    let col = letters.chars().next().map(|c| (c as u8 - b'A') as usize)?;
    let row: u32 = digits.parse().ok()?;
    Some((row, col))
}

fn parse_range(range: &str) -> Option<(u32, usize, u32, usize)> {
    let (a, b) = range.split_once(':')?;
    let (r1, c1) = parse_cell_ref(a)?;
    let (r2, c2) = parse_cell_ref(b)?;
    Some((r1, c1, r2, c2))
}

impl InMemoryStore {
    pub fn new(rows: Vec<Vec<&str>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect();
        Self {
            rows: RefCell::new(rows),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.borrow().clone()
    }

    pub fn column(&self, col: usize) -> Vec<String> {
        self.rows
            .borrow()
            .iter()
            .map(|r| r.get(col).cloned().unwrap_or_default())
            .collect()
    }

    fn bad_range(range: &str) -> RemoteError {
        RemoteError::new(RemoteErrorKind::Fatal, format!("bad range {range}"))
    }
}

impl RowStore for InMemoryStore {
    fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, RemoteError> {
        let (r1, c1, r2, c2) = parse_range(range).ok_or_else(|| Self::bad_range(range))?;
        let rows = self.rows.borrow();
        let mut out = Vec::new();
        for r in r1..=r2.min(rows.len() as u32) {
            let row = &rows[(r - 1) as usize];
            out.push(
                (c1..=c2)
                    .map(|c| row.get(c).cloned().unwrap_or_default())
                    .collect(),
            );
        }
        Ok(out)
    }

    fn update_range(&self, range: &str, values: &[Vec<String>]) -> Result<(), RemoteError> {
        let (r1, c1, _, _) = parse_range(range).ok_or_else(|| Self::bad_range(range))?;
        let mut rows = self.rows.borrow_mut();
        for (i, new_row) in values.iter().enumerate() {
            let target = (r1 - 1) as usize + i;
            while rows.len() <= target {
                rows.push(Vec::new());
            }
            let row = &mut rows[target];
            for (j, value) in new_row.iter().enumerate() {
                let col = c1 + j;
                while row.len() <= col {
                    row.push(String::new());
                }
                row[col] = value.clone();
            }
        }
        Ok(())
    }

    fn insert_row(&self, values: &[String], at: u32, _mode: ValueMode) -> Result<(), RemoteError> {
        let mut rows = self.rows.borrow_mut();
        let idx = ((at - 1) as usize).min(rows.len());
        rows.insert(idx, values.to_vec());
        Ok(())
    }

    fn append_rows(&self, new_rows: &[Vec<String>], _mode: ValueMode) -> Result<(), RemoteError> {
        self.rows.borrow_mut().extend(new_rows.iter().cloned());
        Ok(())
    }

    fn delete_row(&self, row: u32) -> Result<(), RemoteError> {
        let mut rows = self.rows.borrow_mut();
        let idx = (row - 1) as usize;
        if idx >= rows.len() {
            return Err(RemoteError::fatal(format!("row {row} out of range")));
        }
        rows.remove(idx);
        Ok(())
    }

    fn batch_get(&self, ranges: &[String]) -> Result<Vec<Vec<Vec<String>>>, RemoteError> {
        ranges.iter().map(|r| self.get_range(r)).collect()
    }

    fn row_count(&self) -> Result<u32, RemoteError> {
        Ok(self.rows.borrow().len() as u32)
    }
}

struct FakeMessage {
    id: String,
    subject: String,
    body: String,
    read: bool,
}

#[derive(Default)]
pub struct FakeMessageSource {
    messages: RefCell<Vec<FakeMessage>>,
}

impl FakeMessageSource {
    pub fn new(messages: Vec<(&str, &str, &str)>) -> Self {
        let messages = messages
            .into_iter()
            .map(|(id, subject, body)| FakeMessage {
                id: id.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
                read: false,
            })
            .collect();
        Self {
            messages: RefCell::new(messages),
        }
    }

    pub fn read_ids(&self) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|m| m.read)
            .map(|m| m.id.clone())
            .collect()
    }
}

impl MessageSource for FakeMessageSource {
    fn list_unread(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self
            .messages
            .borrow()
            .iter()
            .filter(|m| !m.read)
            .map(|m| m.id.clone())
            .collect())
    }

    fn fetch_subject(&self, id: &str) -> Result<String, RemoteError> {
        self.messages
            .borrow()
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.subject.clone())
            .ok_or_else(|| RemoteError::fatal(format!("no message {id}")))
    }

    fn fetch_body_text(&self, id: &str) -> Result<String, RemoteError> {
        self.messages
            .borrow()
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.body.clone())
            .ok_or_else(|| RemoteError::fatal(format!("no message {id}")))
    }

    fn mark_read(&self, id: &str) -> Result<(), RemoteError> {
        if let Some(m) = self.messages.borrow_mut().iter_mut().find(|m| m.id == id) {
            m.read = true;
        }
        Ok(())
    }
}

/// Scripted scrape results, shared across every session the pool builds so a
/// test can line up a blocked first attempt and a successful retry.
pub enum FakeStep {
    Blocked,
    Empty,
    Record(AuctionRecord),
}

pub struct FakeSession {
    steps: Rc<RefCell<VecDeque<FakeStep>>>,
}

pub fn scripted_steps(steps: Vec<FakeStep>) -> Rc<RefCell<VecDeque<FakeStep>>> {
    Rc::new(RefCell::new(steps.into()))
}

pub fn session_factory(
    steps: &Rc<RefCell<VecDeque<FakeStep>>>,
) -> Box<dyn FnMut(&str) -> Option<FakeSession>> {
    let steps = Rc::clone(steps);
    Box::new(move |_profile| {
        Some(FakeSession {
            steps: Rc::clone(&steps),
        })
    })
}

impl DetailScraper for FakeSession {
    fn scrape_detail(
        &mut self,
        link: &str,
        _state: &str,
        _previous: Option<&AuctionRecord>,
    ) -> ScrapeOutcome {
        match self.steps.borrow_mut().pop_front() {
            Some(FakeStep::Record(record)) => ScrapeOutcome::Fields(Box::new(AuctionRecord {
                link: link.to_string(),
                ..record
            })),
            Some(FakeStep::Blocked) => ScrapeOutcome::Blocked,
            Some(FakeStep::Empty) | None => ScrapeOutcome::Empty,
        }
    }
}
