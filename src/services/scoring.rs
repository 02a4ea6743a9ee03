//! Point computations shared by the games.
//!
//! Every function here is pure; the rule-sets decide when to call them and
//! where to store the result.

use serde::Serialize;

/// Outcome of a judged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The guess or description was right.
    Correct,
    /// The guess was wrong, or the item was skipped.
    Incorrect,
    /// A rule was broken (e.g. a forbidden word was said).
    Penalty,
}

/// Scoring strategy selected by a game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scoring {
    /// +1 for a correct action, -1 on a penalty, nothing otherwise.
    Flat,
    /// Base points plus a capped bonus for the time left on the clock.
    TimeBonus {
        /// Points awarded for any correct answer.
        base: u32,
        /// Seconds of remaining time worth one bonus point.
        divisor: u32,
        /// Upper bound of the bonus.
        cap: u32,
    },
    /// Points proportional to how close a numeric estimate was.
    Proximity {
        /// Factor applied to the 0..=100 accuracy points.
        multiplier: f64,
    },
}

/// Inputs a [`Scoring`] strategy may look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInput {
    /// Judgement of the action.
    pub verdict: Verdict,
    /// Countdown ticks left when the action happened.
    pub time_left: u32,
    /// Accuracy percentage, for estimation games.
    pub accuracy: Option<u32>,
}

impl ScoreInput {
    /// Input for games that only look at the verdict.
    pub fn verdict(verdict: Verdict) -> Self {
        Self {
            verdict,
            time_left: 0,
            accuracy: None,
        }
    }
}

impl Scoring {
    /// Signed point delta for one action.
    pub fn points(&self, input: &ScoreInput) -> i64 {
        match *self {
            Scoring::Flat => flat(input.verdict),
            Scoring::TimeBonus { base, divisor, cap } => match input.verdict {
                Verdict::Correct => i64::from(time_bonus(base, input.time_left, divisor, cap)),
                _ => 0,
            },
            Scoring::Proximity { multiplier } => {
                i64::from(proximity_points(input.accuracy.unwrap_or(0), multiplier))
            }
        }
    }
}

/// +1 for correct, -1 for a penalty, 0 otherwise.
pub fn flat(verdict: Verdict) -> i64 {
    match verdict {
        Verdict::Correct => 1,
        Verdict::Incorrect => 0,
        Verdict::Penalty => -1,
    }
}

/// `base + min(floor(time_left / divisor), cap)`. A zero divisor disables the bonus.
pub fn time_bonus(base: u32, time_left: u32, divisor: u32, cap: u32) -> u32 {
    let bonus = time_left.checked_div(divisor).unwrap_or(0).min(cap);
    base + bonus
}

/// Add a signed delta to a score that never goes below zero.
pub fn apply_delta(score: u32, delta: i64) -> u32 {
    let next = i64::from(score) + delta;
    u32::try_from(next.max(0)).unwrap_or(u32::MAX)
}

/// Accuracy of `guess` against `answer` on the declared range, 0..=100.
///
/// A degenerate range only rewards an exact hit.
pub fn accuracy(guess: f64, answer: f64, min: f64, max: f64) -> u32 {
    let range = max - min;
    if range == 0.0 {
        return if guess == answer { 100 } else { 0 };
    }

    let error = (answer - guess).abs();
    let accuracy = (100.0 - (error / range.abs()) * 100.0).max(0.0);
    accuracy.round() as u32
}

/// Points for an accuracy percentage: `round(accuracy * multiplier)`.
pub fn proximity_points(accuracy: u32, multiplier: f64) -> u32 {
    let base = f64::from(accuracy.min(100));
    (base * multiplier).round().max(0.0) as u32
}

/// Guess submitted on behalf of a player who let the clock run out.
pub fn midpoint(min: f64, max: f64) -> f64 {
    ((min + max) / 2.0).round()
}

/// Whole-number percentage of correct answers, 0 when nothing was answered.
pub fn accuracy_percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(correct) / f64::from(total) * 100.0).round() as u32
}

/// Incrementally maintained, rounded average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunningAverage {
    value: u32,
    samples: u32,
}

impl RunningAverage {
    /// Fold one more sample in: `avg' = round((avg * (n - 1) + sample) / n)`.
    pub fn push(&mut self, sample: u32) -> u32 {
        self.samples += 1;
        let total = f64::from(self.value) * f64::from(self.samples - 1) + f64::from(sample);
        self.value = (total / f64::from(self.samples)).round() as u32;
        self.value
    }

    /// Current average.
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Number of samples folded in.
    pub fn samples(&self) -> u32 {
        self.samples
    }
}

/// Qualitative band for an accuracy percentage, used in result summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    /// 90% and above.
    Excellent,
    /// 75% to 89%.
    VeryGood,
    /// 60% to 74%.
    Good,
    /// 40% to 59%.
    Fair,
    /// Below 40%.
    Beginner,
}

/// Map an accuracy percentage onto a [`PerformanceTier`].
pub fn performance_tier(accuracy: u32) -> PerformanceTier {
    match accuracy {
        90.. => PerformanceTier::Excellent,
        75..=89 => PerformanceTier::VeryGood,
        60..=74 => PerformanceTier::Good,
        40..=59 => PerformanceTier::Fair,
        _ => PerformanceTier::Beginner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_scoring_and_floor() {
        let mut score = 0;
        for _ in 0..5 {
            score = apply_delta(score, flat(Verdict::Penalty));
        }
        assert_eq!(score, 0);

        score = apply_delta(score, flat(Verdict::Correct));
        score = apply_delta(score, flat(Verdict::Incorrect));
        assert_eq!(score, 1);
        score = apply_delta(score, flat(Verdict::Penalty));
        score = apply_delta(score, flat(Verdict::Penalty));
        assert_eq!(score, 0);
    }

    #[test]
    fn time_bonus_is_capped() {
        assert_eq!(time_bonus(5, 12, 1, 15), 17);
        assert_eq!(time_bonus(5, 40, 1, 15), 20);
        assert_eq!(time_bonus(5, 9, 2, 15), 9);
        assert_eq!(time_bonus(5, 9, 0, 15), 5);
    }

    #[test]
    fn accuracy_examples() {
        assert_eq!(accuracy(50.0, 50.0, 0.0, 100.0), 100);
        assert_eq!(accuracy(0.0, 50.0, 0.0, 100.0), 50);
        assert_eq!(accuracy(25.0, 50.0, 0.0, 100.0), 75);
        assert_eq!(accuracy(0.0, 100.0, 0.0, 100.0), 0);
        assert_eq!(accuracy(-500.0, 100.0, 0.0, 100.0), 0);
    }

    #[test]
    fn accuracy_on_degenerate_range() {
        assert_eq!(accuracy(7.0, 7.0, 7.0, 7.0), 100);
        assert_eq!(accuracy(6.0, 7.0, 7.0, 7.0), 0);
    }

    #[test]
    fn proximity_points_apply_multiplier() {
        assert_eq!(proximity_points(100, 1.0), 100);
        assert_eq!(proximity_points(73, 1.5), 110);
        assert_eq!(proximity_points(0, 2.0), 0);
    }

    #[test]
    fn scoring_strategies_dispatch() {
        let correct = ScoreInput {
            verdict: Verdict::Correct,
            time_left: 10,
            accuracy: Some(80),
        };
        assert_eq!(Scoring::Flat.points(&correct), 1);
        assert_eq!(
            Scoring::TimeBonus {
                base: 5,
                divisor: 1,
                cap: 15
            }
            .points(&correct),
            15
        );
        assert_eq!(Scoring::Proximity { multiplier: 2.0 }.points(&correct), 160);

        let wrong = ScoreInput::verdict(Verdict::Incorrect);
        assert_eq!(
            Scoring::TimeBonus {
                base: 5,
                divisor: 1,
                cap: 15
            }
            .points(&wrong),
            0
        );
    }

    #[test]
    fn running_average_rounds_each_step() {
        let mut avg = RunningAverage::default();
        assert_eq!(avg.push(100), 100);
        assert_eq!(avg.push(51), 76);
        assert_eq!(avg.push(0), 51);
        assert_eq!(avg.samples(), 3);
    }

    #[test]
    fn midpoint_rounds() {
        assert_eq!(midpoint(0.0, 100.0), 50.0);
        assert_eq!(midpoint(1.0, 4.0), 3.0);
    }

    #[test]
    fn accuracy_percent_and_tiers() {
        assert_eq!(accuracy_percent(0, 0), 0);
        assert_eq!(accuracy_percent(2, 3), 67);
        assert_eq!(performance_tier(95), PerformanceTier::Excellent);
        assert_eq!(performance_tier(75), PerformanceTier::VeryGood);
        assert_eq!(performance_tier(60), PerformanceTier::Good);
        assert_eq!(performance_tier(40), PerformanceTier::Fair);
        assert_eq!(performance_tier(39), PerformanceTier::Beginner);
    }
}
