//! Sequential pull → tag → push of every transfer entry

use crate::error::Result;
use crate::logging::Logger;
use crate::mirror::list::TransferEntry;
use crate::registry::engine::ContainerEngine;
use crate::registry::session::Session;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct MirrorReport {
    pub mirrored: Vec<TransferEntry>,
    pub elapsed: Duration,
}

pub struct Executor<'a, E> {
    session: &'a Session<E>,
    logger: &'a Logger,
}

impl<'a, E: ContainerEngine> Executor<'a, E> {
    pub fn new(session: &'a Session<E>, logger: &'a Logger) -> Self {
        Self { session, logger }
    }

    /// Transfer every entry in order. The first failure ends the run and the
    /// remaining entries are never attempted.
    pub async fn run(&self, entries: &[TransferEntry]) -> Result<MirrorReport> {
        let start = Instant::now();
        let mut mirrored = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            self.logger.subsection(&format!(
                "[{}/{}] source: {}, target: {}",
                index + 1,
                entries.len(),
                entry.source,
                entry.target
            ));
            let span =
                tracing::info_span!("transfer", source = %entry.source, target = %entry.target);
            self.transfer(entry).instrument(span).await?;
            mirrored.push(entry.clone());
        }

        Ok(MirrorReport {
            mirrored,
            elapsed: start.elapsed(),
        })
    }

    async fn transfer(&self, entry: &TransferEntry) -> Result<()> {
        let engine = self.session.engine();

        self.logger.step(&format!("docker pull {}", entry.source));
        engine.pull(&entry.source).await?;

        self.logger
            .step(&format!("docker tag {} {}", entry.source, entry.target));
        engine.tag(&entry.source, &entry.target).await?;

        self.logger.step(&format!("docker push {}", entry.target));
        engine.push(&entry.target, self.session.auth()).await?;

        self.logger.success(&format!("Mirrored {}", entry.target));
        Ok(())
    }
}
