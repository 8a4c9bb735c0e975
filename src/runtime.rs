use hifitime::prelude::{Duration, Epoch, TimeScale};

use crate::sampler::Acquisition;

#[derive(Debug)]
pub struct Runtime {
    /// Current [Epoch]
    pub epoch: Epoch,

    /// Epoch of deployment
    deploy_time: Epoch,

    /// Uptime as [Duration]
    pub uptime: Duration,

    /// Number of sampling cycles
    pub cycles: u64,

    /// Number of cycles that obtained a fix
    pub fixes: u64,
}

impl Runtime {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            deploy_time: epoch,
            uptime: Default::default(),
            cycles: 0,
            fixes: 0,
        }
    }

    /// Update latest epoch
    pub fn new_epoch(&mut self, epoch: Epoch) {
        self.epoch = epoch.to_time_scale(TimeScale::UTC);
        self.uptime = epoch - self.deploy_time;
    }

    /// Account for a new sampling cycle
    pub fn new_cycle(&mut self, acquisition: &Acquisition) {
        self.cycles += 1;
        if matches!(acquisition, Acquisition::Fix(_)) {
            self.fixes += 1;
        }
    }

    /// Returns current epoch in [TimeScale::UTC]
    pub fn utc_time(&self) -> Epoch {
        self.epoch.to_time_scale(TimeScale::UTC)
    }
}

#[cfg(test)]
mod test {
    use super::Runtime;
    use crate::{nmea::Position, sampler::Acquisition};
    use hifitime::prelude::{Duration, Epoch};
    use std::str::FromStr;

    #[test]
    fn test_uptime_and_counters() {
        let t0 = Epoch::from_str("2020-01-01T00:00:00 UTC").unwrap();
        let mut rtm = Runtime::new(t0);

        rtm.new_epoch(t0 + Duration::from_seconds(30.0));
        rtm.new_cycle(&Acquisition::NoFix);

        rtm.new_epoch(t0 + Duration::from_seconds(60.0));
        rtm.new_cycle(&Acquisition::Fix(Position {
            latitude: 40.5,
            longitude: -99.27572,
        }));

        assert_eq!(rtm.uptime, Duration::from_seconds(60.0));
        assert_eq!(rtm.utc_time(), t0 + Duration::from_seconds(60.0));
        assert_eq!(rtm.cycles, 2);
        assert_eq!(rtm.fixes, 1);
    }
}
