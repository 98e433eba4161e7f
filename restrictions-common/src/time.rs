pub trait TimeSource: Send + Sync {
    // Seconds since the unix epoch
    fn now_unix(&self) -> i64;
}

#[derive(Clone)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn now_unix(&self) -> i64 {
        time::OffsetDateTime::now_utc().unix_timestamp()
    }
}

#[derive(Clone)]
pub struct FixedTime {
    pub time: i64,
}

impl TimeSource for FixedTime {
    fn now_unix(&self) -> i64 {
        self.time
    }
}
