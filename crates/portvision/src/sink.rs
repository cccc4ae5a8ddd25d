//! Where measurements go once a frame is processed.

use std::collections::BTreeMap;

use crate::TargetMeasurement;

pub const KEY_DISTANCE: &str = "distance";
pub const KEY_PLANE_DISTANCE: &str = "plane_distance";
pub const KEY_ANGLE_OTHER: &str = "angle_other";
pub const KEY_ANGLE_VERTICAL: &str = "angle_vertical";
pub const KEY_ANGLE_HORIZONTAL: &str = "angle_horizontal";
pub const KEY_MOMENT: &str = "moment";

/// Receives one call per successfully processed frame and nothing for
/// dropped frames.
pub trait ResultSink {
    fn publish(&mut self, measurement: &TargetMeasurement);
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn publish(&mut self, measurement: &TargetMeasurement) {
        (**self).publish(measurement)
    }
}

/// Flat key-value table, e.g. a robot network table.
pub trait KeyValueStore {
    fn put_number(&mut self, key: &str, value: f64);
    fn put_string(&mut self, key: &str, value: &str);
}

/// Writes each measurement as the flat keys the robot code reads.
///
/// Angles are in degrees, distances in meters.
#[derive(Debug, Default)]
pub struct TableSink<S> {
    store: S,
}

impl<S: KeyValueStore> TableSink<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: KeyValueStore> ResultSink for TableSink<S> {
    fn publish(&mut self, m: &TargetMeasurement) {
        let [x, y, z] = m.angles_deg();
        self.store.put_string(KEY_MOMENT, &m.moment_string());
        self.store.put_number(KEY_ANGLE_OTHER, x);
        self.store.put_number(KEY_ANGLE_VERTICAL, y);
        self.store.put_number(KEY_ANGLE_HORIZONTAL, z);
        self.store.put_number(KEY_PLANE_DISTANCE, m.plane_distance);
        self.store.put_number(KEY_DISTANCE, m.distance);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
}

/// In-memory store; also counts writes.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pub values: BTreeMap<String, Value>,
    pub writes: usize,
}

impl MemoryStore {
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some(Value::Number(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(Value::String(v)) => Some(v),
            _ => None,
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn put_number(&mut self, key: &str, value: f64) {
        self.writes += 1;
        self.values.insert(key.to_owned(), Value::Number(value));
    }

    fn put_string(&mut self, key: &str, value: &str) {
        self.writes += 1;
        self.values
            .insert(key.to_owned(), Value::String(value.to_owned()));
    }
}

/// Logs each measurement at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn publish(&mut self, m: &TargetMeasurement) {
        let [x, y, z] = m.angles_deg();
        log::info!(
            "target at {:.3} m (plane {:.3} m), angles [{x:.2}, {y:.2}, {z:.2}] deg, rms {:.3} px",
            m.distance,
            m.plane_distance,
            m.reprojection_rms()
        );
    }
}

/// Keeps every published measurement.
#[derive(Clone, Debug, Default)]
pub struct VecSink {
    pub measurements: Vec<TargetMeasurement>,
}

impl ResultSink for VecSink {
    fn publish(&mut self, m: &TargetMeasurement) {
        self.measurements.push(m.clone());
    }
}
