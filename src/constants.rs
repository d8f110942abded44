/// Legal deliveries that make up one over.
pub const BALLS_PER_OVER: u32 = 6;

/// Squad size assumed when match setup did not record a lineup for a team.
pub const DEFAULT_TEAM_SIZE: u32 = 11;

/// Penalty run awarded for a wide or a no-ball, on top of any runs taken.
pub const EXTRA_PENALTY_RUNS: u32 = 1;

/// Largest number of runs accepted for a single delivery, off the bat or as extras.
pub const MAX_RUNS_PER_BALL: u32 = 7;

/// Default first-innings deficit required before a follow-on may be enforced in a Test.
pub const DEFAULT_FOLLOW_ON_MARGIN: u32 = 200;

#[non_exhaustive]
pub struct BallLimit;

impl BallLimit {
    pub const T20: u32 = 20 * BALLS_PER_OVER;
    pub const ODI: u32 = 50 * BALLS_PER_OVER;
}

#[non_exhaustive]
pub struct BowlerQuota;

impl BowlerQuota {
    // Overs per bowler in limited-overs cricket
    pub const T20: u32 = 4;
    pub const ODI: u32 = 10;
}
