use std::time::{Duration, Instant};

use super::{
    intervals::{ClockError, Intervals},
    position::TickPosition,
};

/*
Tick Clock
==========

The clock never counts ticks. Every poll recomputes the whole position from
the time elapsed since `start`:

    m  = elapsed / measure                      (integer division)
    q  = (elapsed - m · measure) / beat
    qi = (elapsed - m · measure) - q · beat     (time into the current beat)
    sub[i] = qi / interval[i]                   for i = 2..=divisions

Because nothing accumulates, a late or skipped poll cannot make the clock
drift: the next poll lands on the right position anyway.

Reporting is edge-triggered on the (measure, beat) pair. Subdivision indices
are carried along in each report but do not trigger one on their own; a
listener that wants finer clicks schedules them from the beat interval.

Changing tempo or meter stops the clock. The caller restarts it explicitly, which
resets the origin to the moment of the restart.
*/

pub struct TickClock {
    intervals: Intervals,
    origin: Option<Instant>,
    last: Option<(u64, u32)>,
}

impl TickClock {
    pub fn new(intervals: Intervals) -> Self {
        Self {
            intervals,
            origin: None,
            last: None,
        }
    }

    pub fn intervals(&self) -> &Intervals {
        &self.intervals
    }

    pub fn is_running(&self) -> bool {
        self.origin.is_some()
    }

    /// Musical position after `elapsed` time at the current tempo.
    pub fn position_at(&self, elapsed: Duration) -> TickPosition {
        let runtime = elapsed.as_secs_f64() * 1000.0;
        let intervals = self.intervals.as_slice();

        let measure = (runtime / intervals[0]).floor();
        let into_measure = runtime - measure * intervals[0];
        let beat = (into_measure / intervals[1])
            .floor()
            .min(self.intervals.beats_per_measure() as f64 - 1.0);
        let into_beat = into_measure - beat * intervals[1];

        let mut subdivisions = [0u32; super::intervals::MAX_DIVISIONS];
        let levels = &intervals[2..];
        for (slot, interval) in subdivisions.iter_mut().zip(levels) {
            *slot = (into_beat / interval) as u32;
        }

        TickPosition::new(measure as u64, beat as u32)
            .with_subdivisions(&subdivisions[..levels.len()])
    }

    /// Reset the origin to `now` and start reporting.
    pub fn start(&mut self, now: Instant) {
        self.origin = Some(now);
        self.last = None;
    }

    pub fn stop(&mut self) {
        self.origin = None;
    }

    /// Position at `now`, if the measure or beat changed since the last report.
    pub fn poll(&mut self, now: Instant) -> Option<TickPosition> {
        let origin = self.origin?;
        let position = self.position_at(now.saturating_duration_since(origin));

        let key = position.measure_beat();
        if self.last == Some(key) {
            return None;
        }
        self.last = Some(key);
        Some(position)
    }

    /// Replace the tempo. The clock stops and must be restarted.
    pub fn set_tempo(
        &mut self,
        bpm: f64,
        divisions: usize,
        beats_per_measure: u32,
    ) -> Result<&Intervals, ClockError> {
        let intervals = Intervals::new(bpm, divisions, beats_per_measure)?;
        self.intervals = intervals;
        self.stop();
        Ok(&self.intervals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> TickClock {
        // 120 bpm: beat = 500 ms, measure = 2000 ms
        TickClock::new(Intervals::new(120.0, 4, 4).unwrap())
    }

    #[test]
    fn position_from_elapsed_time() {
        let clock = clock();

        let position = clock.position_at(Duration::from_millis(2_760));
        assert_eq!(position.measure_beat(), (1, 1));
        // 260 ms into the beat: eighths of 250, triplets of 166.7, sixteenths of 125
        assert_eq!(position.subdivisions(), &[1, 1, 2]);
    }

    #[test]
    fn reports_only_on_beat_change() {
        let mut clock = clock();
        let origin = Instant::now();
        clock.start(origin);

        let first = clock.poll(origin + Duration::from_millis(1));
        assert_eq!(first.map(|p| p.measure_beat()), Some((0, 0)));
        assert_eq!(clock.poll(origin + Duration::from_millis(300)), None);

        let second = clock.poll(origin + Duration::from_millis(510));
        assert_eq!(second.map(|p| p.measure_beat()), Some((0, 1)));
    }

    #[test]
    fn reports_measure_change_when_measure_has_one_beat() {
        let mut clock = TickClock::new(Intervals::new(120.0, 1, 1).unwrap());
        let origin = Instant::now();
        clock.start(origin);

        assert!(clock.poll(origin + Duration::from_millis(10)).is_some());
        let next = clock.poll(origin + Duration::from_millis(510));
        assert_eq!(next.map(|p| p.measure_beat()), Some((1, 0)));
    }

    #[test]
    fn positions_never_decrease() {
        let clock = clock();
        let mut previous = clock.position_at(Duration::ZERO);
        for ms in (0..10_000).step_by(7) {
            let position = clock.position_at(Duration::from_millis(ms));
            assert!(position >= previous, "{position:?} < {previous:?}");
            previous = position;
        }
    }

    #[test]
    fn stopped_clock_is_silent() {
        let mut clock = clock();
        assert_eq!(clock.poll(Instant::now()), None);

        let origin = Instant::now();
        clock.start(origin);
        clock.stop();
        assert_eq!(clock.poll(origin + Duration::from_secs(1)), None);
    }

    #[test]
    fn tempo_change_stops_clock() {
        let mut clock = clock();
        clock.start(Instant::now());

        let intervals = clock.set_tempo(60.0, 2, 3).unwrap();
        assert_eq!(intervals.beat(), 1000.0);
        assert_eq!(intervals.measure(), 3000.0);
        assert!(!clock.is_running());
    }

    #[test]
    fn malformed_tempo_keeps_previous_intervals() {
        let mut clock = clock();
        clock.start(Instant::now());

        assert!(clock.set_tempo(-3.0, 2, 4).is_err());
        assert_eq!(clock.intervals().beat(), 500.0);
        assert!(clock.is_running());
    }

    #[test]
    fn restart_resets_origin() {
        let mut clock = clock();
        let origin = Instant::now();
        clock.start(origin);
        clock.poll(origin + Duration::from_millis(1_600));

        let restart = origin + Duration::from_secs(5);
        clock.start(restart);
        let position = clock.poll(restart + Duration::from_millis(5));
        assert_eq!(position.map(|p| p.measure_beat()), Some((0, 0)));
    }
}
