// Shared test fakes: scripted counter sources and discovery probes
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use hostmon::counters::CounterSource;
use hostmon::models::CounterSample;
use hostmon::nat::{NatProbe, ProbeReport, RawMapping};

/// One scripted poll outcome.
pub enum PollStep {
    Counters(Vec<(&'static str, u64, u64)>),
    Fail(&'static str),
}

/// Counter source replaying a fixed script; once exhausted it returns empty
/// responses, which leave tracked snapshots untouched.
pub struct ScriptedCounters {
    steps: Mutex<VecDeque<PollStep>>,
}

impl ScriptedCounters {
    pub fn new(steps: Vec<PollStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
        }
    }
}

impl CounterSource for ScriptedCounters {
    fn poll(&self, _names: &[String]) -> anyhow::Result<HashMap<String, CounterSample>> {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(PollStep::Counters(entries)) => Ok(entries
                .iter()
                .map(|(name, bytes_read, bytes_written)| {
                    (
                        name.to_string(),
                        CounterSample {
                            bytes_read: *bytes_read,
                            bytes_written: *bytes_written,
                        },
                    )
                })
                .collect()),
            Some(PollStep::Fail(msg)) => Err(anyhow::anyhow!(msg)),
            None => Ok(HashMap::new()),
        }
    }
}

/// One scripted probe outcome.
pub enum ProbeStep {
    Report(RawMapping, &'static str),
    Fail(&'static str),
}

/// Discovery probe replaying a fixed script; an exhausted script errors,
/// which the tracker treats as a skipped refresh. Counts discover calls.
pub struct ScriptedProbe {
    steps: Mutex<VecDeque<ProbeStep>>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(steps: Vec<ProbeStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NatProbe for ScriptedProbe {
    fn discover(&self, _server: &str) -> anyhow::Result<ProbeReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(ProbeStep::Report(mapping, addr)) => Ok(ProbeReport {
                mapping,
                public_addr: addr.to_string(),
            }),
            Some(ProbeStep::Fail(msg)) => Err(anyhow::anyhow!(msg)),
            None => Err(anyhow::anyhow!("probe script exhausted")),
        }
    }
}
