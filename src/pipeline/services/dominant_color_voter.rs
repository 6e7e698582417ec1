use indexmap::IndexMap;
use tracing::debug;

use crate::common::Frame;
use crate::pipeline::services::image::VisionBackend;
use crate::pipeline::types::ColorRange;

/// Accumulated confidence per tracked color for one capture window.
///
/// Entries keep the configured color order. When two or more colors share the
/// maximum, the one configured first wins; an all-zero tally has no winner.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteTally {
    votes: IndexMap<String, f32>,
}

impl VoteTally {
    pub fn new<'a, I>(colors: I) -> Self
    where
        I: IntoIterator<Item = &'a ColorRange>,
    {
        Self {
            votes: colors
                .into_iter()
                .map(|range| (range.name.clone(), 0.0))
                .collect(),
        }
    }

    /// Adds to a tracked color; untracked names are ignored.
    pub fn add(&mut self, color: &str, confidence: f32) {
        if let Some(total) = self.votes.get_mut(color) {
            *total += confidence;
        }
    }

    pub fn get(&self, color: &str) -> Option<f32> {
        self.votes.get(color).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.votes.iter().map(|(name, total)| (name.as_str(), *total))
    }

    pub fn winner(&self) -> Option<&str> {
        let mut best: Option<(&str, f32)> = None;
        for (name, total) in self.iter() {
            match best {
                Some((_, top)) if total <= top => {}
                _ => best = Some((name, total)),
            }
        }
        best.filter(|(_, total)| *total > 0.0).map(|(name, _)| name)
    }
}

/// Picks the color with the highest summed confidence over a window of frames.
#[derive(Debug, Clone)]
pub struct DominantColorVoter {
    colors: Vec<ColorRange>,
}

impl DominantColorVoter {
    pub fn new(colors: Vec<ColorRange>) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &[ColorRange] {
        &self.colors
    }

    pub fn tally(&self, frames: &[Frame], backend: &dyn VisionBackend) -> VoteTally {
        let mut tally = VoteTally::new(&self.colors);
        for frame in frames {
            for range in &self.colors {
                let mask = backend.mask(frame, range);
                tally.add(&range.name, mask.confidence);
            }
        }
        tally
    }

    pub fn vote(&self, frames: &[Frame], backend: &dyn VisionBackend) -> Option<String> {
        let tally = self.tally(frames, backend);
        debug!("Vote over {} frame(s): {:?}", frames.len(), tally);
        tally.winner().map(str::to_string)
    }
}
