text_enum! {
    /// A step of the processing job.
    ///
    /// Stages only move forward: `uploading -> processing -> analyzing -> complete`,
    /// and any non-terminal stage may drop straight to `failed`.
    pub enum Stage {
        Uploading => "uploading",
        Processing => "processing",
        Analyzing => "analyzing",
        Complete => "complete",
        Failed => "failed",
    }
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed)
    }

    /// The stage reached when the current one succeeds.
    pub fn successor(&self) -> Option<Stage> {
        match self {
            Stage::Uploading => Some(Stage::Processing),
            Stage::Processing => Some(Stage::Analyzing),
            Stage::Analyzing => Some(Stage::Complete),
            Stage::Complete | Stage::Failed => None,
        }
    }

    /// Position along the success path. `failed` sorts after everything so a
    /// terminal failure is never mistaken for an earlier stage.
    pub fn rank(&self) -> u8 {
        match self {
            Stage::Uploading => 0,
            Stage::Processing => 1,
            Stage::Analyzing => 2,
            Stage::Complete => 3,
            Stage::Failed => 4,
        }
    }

    /// Whether a job in `self` may be written with stage `next`.
    ///
    /// Staying on the same non-terminal stage is allowed so progress can be
    /// published in several steps.
    pub fn can_transition_to(&self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }

        next == *self || next == Stage::Failed || self.successor() == Some(next)
    }
}

text_enum! {
    pub enum GameStatus {
        Uploaded => "uploaded",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
    }
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Completed | GameStatus::Failed)
    }
}
