use super::tracker::TrackerId;

/// An entity-level change emitted by the store after a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    TrackerInserted(TrackerId),
    TrackerUpdated(TrackerId),
    TrackerDeleted(TrackerId),
    PinChanged(TrackerId),
    RecordInserted(TrackerId),
    RecordDeleted(TrackerId),
    CategoryInserted(String),
    CategoryRenamed { from: String, to: String },
    CategoryDeleted(String),
}

impl StoreEvent {
    /// The tracker this event is about, if it is a tracker-level event
    pub fn tracker_id(&self) -> Option<TrackerId> {
        match self {
            StoreEvent::TrackerInserted(id)
            | StoreEvent::TrackerUpdated(id)
            | StoreEvent::TrackerDeleted(id)
            | StoreEvent::PinChanged(id)
            | StoreEvent::RecordInserted(id)
            | StoreEvent::RecordDeleted(id) => Some(*id),
            StoreEvent::CategoryInserted(_)
            | StoreEvent::CategoryRenamed { .. }
            | StoreEvent::CategoryDeleted(_) => None,
        }
    }
}
