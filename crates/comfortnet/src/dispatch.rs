//! Fan-out of decoded bus traffic to registered listeners
//!
//! Three independent tables: application data by string key, control
//! commands by command type, and eavesdropped packets by message type.
//! Registration is append-only. Listeners run synchronously, in
//! registration order, inside the tick that produced the event.

use std::{collections::BTreeMap, rc::Rc};

use crate::{
    identity::MacAddress,
    well_known::{CommandType, MessageType, NodeType},
};

/// Data key of membership changes
pub const DATA_KEY_NETWORK_STATUS: &str = "NETWORK_STATUS";

#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Bool(bool),
    Float(f32),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataEvent {
    pub device_type: NodeType,
    pub value: DataValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandEvent {
    /// The commanded node for a command, the responding node for a response
    pub node_type: NodeType,
    pub node_mac: Option<MacAddress>,
    pub command: CommandType,
    pub response: bool,
    /// Argument bytes after the command header
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PacketEvent {
    pub node_type: NodeType,
    pub node_mac: Option<MacAddress>,
    pub message_type: MessageType,
    pub payload: Vec<u8>,
}

impl PacketEvent {
    pub fn request(&self) -> MessageType {
        self.message_type.request()
    }

    pub fn response(&self) -> MessageType {
        self.message_type.response()
    }
}

pub type Listener<E> = Rc<dyn Fn(&E)>;

/// Key to ordered listener list
pub struct ListenerTable<K, E> {
    listeners: BTreeMap<K, Vec<Listener<E>>>,
}

impl<K: Ord, E> Default for ListenerTable<K, E> {
    fn default() -> Self {
        Self {
            listeners: BTreeMap::new(),
        }
    }
}

impl<K: Ord, E> ListenerTable<K, E> {
    pub fn register(&mut self, key: K, listener: Listener<E>) {
        self.listeners.entry(key).or_default().push(listener);
    }

    /// Snapshot of the listeners for `key`. Dispatching from a snapshot
    /// keeps the iteration stable if a listener registers another.
    pub fn snapshot(&self, key: &K) -> Vec<Listener<E>> {
        self.listeners.get(key).cloned().unwrap_or_default()
    }

    /// Invoke every listener for `key`, returning how many ran
    pub fn call(&self, key: &K, event: &E) -> usize {
        let listeners = self.snapshot(key);
        for listener in listeners.iter() {
            listener(event);
        }
        listeners.len()
    }

    pub fn len(&self, key: &K) -> usize {
        self.listeners.get(key).map_or(0, Vec::len)
    }
}

#[derive(Default)]
pub struct Registry {
    pub data: ListenerTable<String, DataEvent>,
    pub commands: ListenerTable<CommandType, CommandEvent>,
    pub packets: ListenerTable<MessageType, PacketEvent>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn registration_order() {
        let seen = Rc::new(RefCell::new(vec![]));
        let mut table: ListenerTable<CommandType, CommandEvent> = ListenerTable::default();
        for i in 0..3 {
            let seen = seen.clone();
            table.register(
                CommandType::HEAT_DEMAND,
                Rc::new(move |ev: &CommandEvent| seen.borrow_mut().push((i, ev.payload.clone()))),
            );
        }
        let ev = CommandEvent {
            node_type: NodeType::GAS_FURNACE,
            node_mac: None,
            command: CommandType::HEAT_DEMAND,
            response: false,
            payload: vec![0x10],
        };
        assert_eq!(table.call(&CommandType::HEAT_DEMAND, &ev), 3);
        assert_eq!(table.call(&CommandType::COOL_DEMAND, &ev), 0);
        assert_eq!(
            *seen.borrow(),
            vec![(0, vec![0x10]), (1, vec![0x10]), (2, vec![0x10])]
        );
    }

    #[test]
    fn registering_during_dispatch() {
        let table: Rc<RefCell<ListenerTable<String, DataEvent>>> = Rc::default();
        let seen = Rc::new(RefCell::new(vec![]));

        let sink = seen.clone();
        let inner = table.clone();
        table.borrow_mut().register(
            "OUTDOOR_TEMP".to_string(),
            Rc::new(move |ev: &DataEvent| {
                sink.borrow_mut().push(ev.value.clone());
                let sink = sink.clone();
                // Only takes effect from the next call
                inner.borrow_mut().register(
                    "OUTDOOR_TEMP".to_string(),
                    Rc::new(move |ev: &DataEvent| sink.borrow_mut().push(ev.value.clone())),
                );
            }),
        );

        let key = "OUTDOOR_TEMP".to_string();
        let temp = DataEvent {
            device_type: NodeType::HEAT_PUMP,
            value: DataValue::Float(4.5),
        };
        let listeners = table.borrow().snapshot(&key);
        for listener in listeners {
            listener(&temp);
        }
        assert_eq!(*seen.borrow(), vec![DataValue::Float(4.5)]);
        assert_eq!(table.borrow().len(&key), 2);

        let label = DataEvent {
            device_type: NodeType::HEAT_PUMP,
            value: DataValue::Text("defrost".to_string()),
        };
        let listeners = table.borrow().snapshot(&key);
        for listener in listeners {
            listener(&label);
        }
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(seen.borrow()[1], DataValue::Text("defrost".to_string()));
        assert_eq!(table.borrow().len(&key), 3);
        assert_eq!(table.borrow().len(&"OTHER".to_string()), 0);
    }

    #[test]
    fn packet_event_variants() {
        let ev = PacketEvent {
            node_type: NodeType::GAS_FURNACE,
            node_mac: None,
            message_type: MessageType::GET_STATUS_RESPONSE,
            payload: vec![],
        };
        assert_eq!(ev.request(), MessageType::GET_STATUS);
        assert_eq!(ev.response(), MessageType::GET_STATUS_RESPONSE);
    }
}
