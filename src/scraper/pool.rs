// src/scraper/pool.rs
//
// Round-robin pool of scraping sessions. A session that trips a block is
// evicted into a cooldown bench and only rebuilt after COOLDOWN_WINDOW
// units of work have passed, so a burned fingerprint is not re-presented
// immediately.

use crate::config::COOLDOWN_WINDOW;

struct CooldownEntry {
    profile: String,
    remaining: u32,
}

pub struct SessionPool<S> {
    active: Vec<(String, S)>,
    cooldown: Vec<CooldownEntry>,
    factory: Box<dyn FnMut(&str) -> Option<S>>,
    next: usize,
}

impl<S> SessionPool<S> {
    pub fn new(factory: Box<dyn FnMut(&str) -> Option<S>>) -> Self {
        Self {
            active: Vec::new(),
            cooldown: Vec::new(),
            factory,
            next: 0,
        }
    }

    /// Build one session per profile. Profiles whose session fails to
    /// construct are skipped with a warning.
    pub fn bootstrap(&mut self, profiles: &[String]) {
        for profile in profiles {
            match (self.factory)(profile) {
                Some(session) => self.active.push((profile.clone(), session)),
                None => eprintln!("⚠️ Could not start session for {profile}"),
            }
        }
        println!("🚀 Session pool ready with {} session(s)", self.active.len());
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Round-robin pick of the next active session index.
    pub fn pick(&mut self) -> Option<usize> {
        if self.active.is_empty() {
            return None;
        }
        let idx = self.next % self.active.len();
        self.next = self.next.wrapping_add(1);
        Some(idx)
    }

    pub fn session_mut(&mut self, idx: usize) -> &mut S {
        &mut self.active[idx].1
    }

    pub fn profile_name(&self, idx: usize) -> &str {
        &self.active[idx].0
    }

    /// Drop a blocked session and bench its profile.
    pub fn evict(&mut self, idx: usize) {
        let (profile, _session) = self.active.remove(idx);
        eprintln!("🧊 {profile} benched for {COOLDOWN_WINDOW} entries");
        self.cooldown.push(CooldownEntry {
            profile,
            remaining: COOLDOWN_WINDOW,
        });
    }

    /// Advance the cooldown clock by one unit of work. Profiles that reach
    /// zero are rebuilt; a failed rebuild resets the full window.
    pub fn tick(&mut self) {
        if self.cooldown.is_empty() {
            return;
        }
        let benched = std::mem::take(&mut self.cooldown);
        for mut entry in benched {
            entry.remaining = entry.remaining.saturating_sub(1);
            if entry.remaining > 0 {
                self.cooldown.push(entry);
                continue;
            }
            match (self.factory)(&entry.profile) {
                Some(session) => {
                    println!("🔄 {} back in rotation", entry.profile);
                    self.active.push((entry.profile, session));
                }
                None => {
                    eprintln!("⚠️ Rebuild failed for {}, re-benching", entry.profile);
                    entry.remaining = COOLDOWN_WINDOW;
                    self.cooldown.push(entry);
                }
            }
        }
    }
}
