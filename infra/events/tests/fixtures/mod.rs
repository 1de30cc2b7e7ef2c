use moe_event_bus::Routed;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestTopic {
    Created,
    Deleted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestEvent {
    Created(usize),
    Deleted(usize),
}

impl Routed for TestEvent {
    type Topic = TestTopic;

    fn topic(&self) -> TestTopic {
        match self {
            Self::Created(_) => TestTopic::Created,
            Self::Deleted(_) => TestTopic::Deleted,
        }
    }
}
