use crate::snapshotter::Snapshotter;
use std::sync::Arc;
use std::time::SystemTime;

pub struct AppState {
    pub snapshotter: Arc<Snapshotter>,
    pub start_time: SystemTime,
}

impl AppState {
    pub fn new(snapshotter: Arc<Snapshotter>) -> Arc<Self> {
        Arc::new(AppState {
            snapshotter,
            start_time: SystemTime::now(),
        })
    }
}
