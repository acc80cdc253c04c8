use std::fmt;
use std::str::FromStr;

use photomesh_core::PhotomeshError;

/// One step of the geometry-preparation pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Realize = 1,
    Merge = 2,
    Resolve = 3,
    Tessellate = 4,
    Export = 5,
    RunEngine = 6,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Self::Realize,
        Self::Merge,
        Self::Resolve,
        Self::Tessellate,
        Self::Export,
        Self::RunEngine,
    ];

    /// The stage after this one, if any.
    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.number() as usize).copied()
    }

    /// 1-based position in the pipeline.
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Realize => "realize",
            Self::Merge => "merge",
            Self::Resolve => "resolve",
            Self::Tessellate => "tessellate",
            Self::Export => "export",
            Self::RunEngine => "run-engine",
        }
    }
}

impl TryFrom<u8> for Stage {
    type Error = PhotomeshError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        n.checked_sub(1)
            .and_then(|i| Self::ALL.get(i as usize).copied())
            .ok_or_else(|| PhotomeshError::validation(format!("no pipeline stage {n}")))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.name())
    }
}

/// Where a pipeline run stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopAfter {
    /// Stop once this stage has completed.
    Stage(Stage),
    /// Run every stage.
    #[default]
    All,
}

impl StopAfter {
    /// The last stage that will run.
    pub fn last_stage(self) -> Stage {
        match self {
            Self::Stage(stage) => stage,
            Self::All => Stage::RunEngine,
        }
    }
}

impl From<Stage> for StopAfter {
    fn from(stage: Stage) -> Self {
        Self::Stage(stage)
    }
}

impl FromStr for StopAfter {
    type Err = PhotomeshError;

    /// Accepts `"1"`..`"6"`, `"all"`, and the legacy `"9"` for "run everything".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") || s == "9" {
            return Ok(Self::All);
        }
        s.parse::<u8>()
            .ok()
            .and_then(|n| Stage::try_from(n).ok())
            .map(Self::Stage)
            .ok_or_else(|| {
                PhotomeshError::format("stop_after", format!("expected 1-6 or \"all\", got {s:?}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let mut stage = Stage::Realize;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen, Stage::ALL);
        assert_eq!(Stage::RunEngine.number(), 6);
        assert_eq!(Stage::try_from(3).unwrap(), Stage::Resolve);
        assert!(Stage::try_from(0).is_err());
        assert!(Stage::try_from(7).is_err());
    }

    #[test]
    fn test_parse_stop_after() {
        assert_eq!("2".parse::<StopAfter>().unwrap(), StopAfter::Stage(Stage::Merge));
        assert_eq!("all".parse::<StopAfter>().unwrap(), StopAfter::All);
        assert_eq!("ALL".parse::<StopAfter>().unwrap(), StopAfter::All);
        assert_eq!("9".parse::<StopAfter>().unwrap(), StopAfter::All);
        assert!("0".parse::<StopAfter>().is_err());
        assert!("merge".parse::<StopAfter>().is_err());
        assert_eq!(StopAfter::All.last_stage(), Stage::RunEngine);
    }
}
