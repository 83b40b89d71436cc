use serde::{Deserialize, Serialize};

use crate::types::{Bytes, EventRecord, Identity, Selector};

/// One-shot revert expectation, consumed by the next top-level call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevertExpectation {
    /// Any failure matches.
    Any,
    /// The failure payload must equal this exactly.
    Payload(Bytes),
    /// The leading four bytes of the failure payload must equal this.
    Selector(Selector),
}

impl RevertExpectation {
    pub fn matches(&self, payload: &Bytes) -> bool {
        match self {
            RevertExpectation::Any => true,
            RevertExpectation::Payload(expected) => expected == payload,
            RevertExpectation::Selector(sel) => Selector::of(payload) == Some(*sel),
        }
    }
}

/// Field-check flags for an event expectation. A false flag means that
/// field is not compared at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitFilter {
    pub check_topic1: bool,
    pub check_topic2: bool,
    pub check_topic3: bool,
    pub check_data: bool,
    /// When set, only events from this emitter can satisfy the
    /// expectation.
    pub emitter: Option<Identity>,
}

impl EmitFilter {
    /// Check all three topics and the data field.
    pub fn checking_all() -> Self {
        EmitFilter {
            check_topic1: true,
            check_topic2: true,
            check_topic3: true,
            check_data: true,
            emitter: None,
        }
    }

    /// Check only the data field.
    pub fn data_only() -> Self {
        EmitFilter {
            check_topic1: false,
            check_topic2: false,
            check_topic3: false,
            check_data: true,
            emitter: None,
        }
    }

    pub fn with_topic1(mut self, check: bool) -> Self {
        self.check_topic1 = check;
        self
    }

    pub fn with_topic2(mut self, check: bool) -> Self {
        self.check_topic2 = check;
        self
    }

    pub fn with_topic3(mut self, check: bool) -> Self {
        self.check_topic3 = check;
        self
    }

    pub fn with_data(mut self, check: bool) -> Self {
        self.check_data = check;
        self
    }

    pub fn from_emitter(mut self, emitter: Identity) -> Self {
        self.emitter = Some(emitter);
        self
    }

    fn topic_matches(index: usize, template: &EventRecord, candidate: &EventRecord) -> bool {
        template.topics.get(index) == candidate.topics.get(index)
    }

    /// Compare a candidate event against the captured template on the
    /// checked fields only.
    pub fn matches(&self, template: &EventRecord, candidate: &EventRecord) -> bool {
        if let Some(emitter) = self.emitter {
            if candidate.origin != emitter {
                return false;
            }
        }
        if self.check_topic1 && !Self::topic_matches(0, template, candidate) {
            return false;
        }
        if self.check_topic2 && !Self::topic_matches(1, template, candidate) {
            return false;
        }
        if self.check_topic3 && !Self::topic_matches(2, template, candidate) {
            return false;
        }
        if self.check_data && template.data != candidate.data {
            return false;
        }
        true
    }
}

/// Armed event expectation. The first event observed after arming is
/// captured as the template; a later event matching the template on the
/// checked fields satisfies the expectation.
#[derive(Debug, Clone)]
pub struct EmitExpectation {
    pub filter: EmitFilter,
    pub template: Option<EventRecord>,
    pub satisfied: bool,
}

impl EmitExpectation {
    pub fn new(filter: EmitFilter) -> Self {
        EmitExpectation {
            filter,
            template: None,
            satisfied: false,
        }
    }

    /// Feed one event through the expectation.
    pub fn observe(&mut self, event: &EventRecord) {
        if self.satisfied {
            return;
        }
        match &self.template {
            None => self.template = Some(event.clone()),
            Some(template) => {
                if self.filter.matches(template, event) {
                    self.satisfied = true;
                }
            }
        }
    }
}

/// Outstanding call expectation. Satisfied by any later dispatch with
/// the exact target and payload, and the exact value when one is given.
#[derive(Debug, Clone)]
pub struct CallExpectation {
    pub target: Identity,
    pub value: Option<u128>,
    pub data: Bytes,
    pub satisfied: bool,
}

impl CallExpectation {
    pub fn new(target: Identity, value: Option<u128>, data: Bytes) -> Self {
        CallExpectation {
            target,
            value,
            data,
            satisfied: false,
        }
    }

    pub fn matches(&self, target: Identity, value: u128, data: &Bytes) -> bool {
        self.target == target && self.data == *data && self.value.map_or(true, |v| v == value)
    }
}
