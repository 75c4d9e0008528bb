//! Simulated traffic from fixed clock-time rush windows.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{Result, TravelEtaError};

/// Traffic propositions for one estimation request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficState {
    pub morning_rush: bool,
    pub evening_rush: bool,
    pub normal_traffic: bool,
    /// Never set by the rush window rules; kept so downstream consumers
    /// can see the congestion level is not modelled.
    pub high_traffic: bool,
}

impl TrafficState {
    #[must_use]
    pub fn is_rush(&self) -> bool {
        self.morning_rush || self.evening_rush
    }

    #[must_use]
    pub fn describe(&self) -> &'static str {
        match (self.morning_rush, self.evening_rush) {
            (true, _) => "Hora punta (mañana)",
            (_, true) => "Hora punta (tarde)",
            _ if self.normal_traffic => "Tráfico normal",
            _ => "Sin tráfico",
        }
    }
}

/// Closed interval of minutes since midnight, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RushWindow {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl RushWindow {
    pub const MORNING: RushWindow = RushWindow {
        start_minute: 8 * 60,
        end_minute: 9 * 60,
    };
    pub const EVENING: RushWindow = RushWindow {
        start_minute: 17 * 60,
        end_minute: 19 * 60,
    };

    pub fn new(start_minute: u32, end_minute: u32) -> Result<Self> {
        if start_minute > end_minute || end_minute >= 24 * 60 {
            return Err(TravelEtaError::validation(format!(
                "Invalid rush window {start_minute}..={end_minute}"
            )));
        }
        Ok(Self {
            start_minute,
            end_minute,
        })
    }

    pub fn from_times(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        Self::new(minutes_since_midnight(&start), minutes_since_midnight(&end))
    }

    #[must_use]
    pub fn contains(&self, minute: u32) -> bool {
        minute >= self.start_minute && minute <= self.end_minute
    }
}

/// Derives traffic propositions from the wall clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrafficEstimator {
    morning: RushWindow,
    evening: RushWindow,
}

impl Default for TrafficEstimator {
    fn default() -> Self {
        Self::new(RushWindow::MORNING, RushWindow::EVENING)
    }
}

impl TrafficEstimator {
    #[must_use]
    pub fn new(morning: RushWindow, evening: RushWindow) -> Self {
        Self { morning, evening }
    }

    /// Traffic state at `now`, read in whatever timezone `now` carries.
    /// Seconds are ignored, so 09:00:59 still counts as morning rush.
    #[must_use]
    pub fn current_traffic_state<T: Timelike>(&self, now: &T) -> TrafficState {
        let minute = minutes_since_midnight(now);
        let morning_rush = self.morning.contains(minute);
        let evening_rush = self.evening.contains(minute);

        TrafficState {
            morning_rush,
            evening_rush,
            normal_traffic: !(morning_rush || evening_rush),
            high_traffic: false,
        }
    }
}

/// Traffic state for the default rush windows
#[must_use]
pub fn current_traffic_state<T: Timelike>(now: &T) -> TrafficState {
    TrafficEstimator::default().current_traffic_state(now)
}

fn minutes_since_midnight<T: Timelike>(time: &T) -> u32 {
    time.hour() * 60 + time.minute()
}
