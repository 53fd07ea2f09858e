//! Token payloads of the queueing model.

use crate::error::{SimError, SimResult};
use crate::time::VirtualTime;
use crate::token::TokenValue;

pub const COUNTER: &str = "counter";
pub const QUEUE: &str = "queue";
pub const SERVER: &str = "server";
pub const BUSY: &str = "busy";
pub const CUSTOMERS: &str = "customers";
pub const SAMPLES: &str = "samples";
pub const TIMER: &str = "timer";

/// A customer, identified as `g<n>` in arrival order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Customer {
    pub id: String,
    pub arrival_time: VirtualTime,
}

impl Customer {
    pub fn new(counter: u64, arrival_time: VirtualTime) -> Self {
        Customer {
            id: format!("g{}", counter),
            arrival_time,
        }
    }
}

/// A server token.
///
/// `released` is set when the server has just finished a job and still
/// has to decide whether to take a break; it cannot start service until
/// that decision has been made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Server {
    pub id: u32,
    pub released: bool,
}

/// A server paired with the customer it is serving.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Busy {
    pub server: Server,
    pub customer: Customer,
    pub started_at: VirtualTime,
}

/// Every payload the model's places carry. Each place accepts exactly
/// one variant, named by [`TokenValue::kind`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Next customer number for the arrival generator.
    Counter(u64),
    /// The waiting line, head first.
    Queue(Vec<Customer>),
    Server(Server),
    Busy(Busy),
    /// An aggregate list of customers (`served`, `gone`).
    Customers(Vec<Customer>),
    /// An aggregate list of durations (`service_times`, `waiting_times`).
    Samples(Vec<f64>),
    /// Paces the reneging check; only its timestamp matters.
    Timer,
}

impl TokenValue for Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Counter(_) => COUNTER,
            Value::Queue(_) => QUEUE,
            Value::Server(_) => SERVER,
            Value::Busy(_) => BUSY,
            Value::Customers(_) => CUSTOMERS,
            Value::Samples(_) => SAMPLES,
            Value::Timer => TIMER,
        }
    }
}

impl Value {
    fn unexpected(&self, expected: &'static str) -> SimError {
        SimError::UnexpectedValue {
            expected,
            actual: self.kind(),
        }
    }

    pub fn into_counter(self) -> SimResult<u64> {
        match self {
            Value::Counter(n) => Ok(n),
            other => Err(other.unexpected(COUNTER)),
        }
    }

    pub fn into_queue(self) -> SimResult<Vec<Customer>> {
        match self {
            Value::Queue(q) => Ok(q),
            other => Err(other.unexpected(QUEUE)),
        }
    }

    pub fn into_server(self) -> SimResult<Server> {
        match self {
            Value::Server(s) => Ok(s),
            other => Err(other.unexpected(SERVER)),
        }
    }

    pub fn into_busy(self) -> SimResult<Busy> {
        match self {
            Value::Busy(b) => Ok(b),
            other => Err(other.unexpected(BUSY)),
        }
    }

    pub fn into_customers(self) -> SimResult<Vec<Customer>> {
        match self {
            Value::Customers(c) => Ok(c),
            other => Err(other.unexpected(CUSTOMERS)),
        }
    }

    pub fn into_samples(self) -> SimResult<Vec<f64>> {
        match self {
            Value::Samples(s) => Ok(s),
            other => Err(other.unexpected(SAMPLES)),
        }
    }

    pub fn as_queue(&self) -> Option<&[Customer]> {
        match self {
            Value::Queue(q) => Some(q.as_slice()),
            _ => None,
        }
    }

    pub fn as_server(&self) -> Option<&Server> {
        match self {
            Value::Server(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_busy(&self) -> Option<&Busy> {
        match self {
            Value::Busy(b) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_ids() {
        let c = Customer::new(7, VirtualTime::new(3.0));
        assert_eq!(c.id, "g7");
        assert_eq!(c.arrival_time, VirtualTime::new(3.0));
    }

    #[test]
    fn test_kinds_are_distinct() {
        let values = [
            Value::Counter(1),
            Value::Queue(vec![]),
            Value::Server(Server {
                id: 0,
                released: false,
            }),
            Value::Customers(vec![]),
            Value::Samples(vec![]),
            Value::Timer,
        ];
        let mut kinds: Vec<_> = values.iter().map(|v| v.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), values.len());
    }

    #[test]
    fn test_unpack_wrong_variant() {
        let err = Value::Counter(1).into_queue().unwrap_err();
        assert_eq!(
            err,
            SimError::UnexpectedValue {
                expected: "queue",
                actual: "counter",
            }
        );
        assert_eq!(Value::Samples(vec![1.0]).into_samples().unwrap(), vec![1.0]);
        assert!(Value::Counter(1).as_server().is_none());
    }
}
