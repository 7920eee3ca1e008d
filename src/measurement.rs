use std::fmt;

use crate::proto::command::{MonitorChannel, ParameterCode};

/// Anything a measurement reports a value for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Parameter(ParameterCode),
    Monitor(MonitorChannel),
}

impl Quantity {
    pub fn unit(&self) -> &'static str {
        match self {
            Quantity::Parameter(code) => code.unit(),
            Quantity::Monitor(channel) => channel.unit(),
        }
    }
}

impl From<ParameterCode> for Quantity {
    fn from(value: ParameterCode) -> Self {
        Quantity::Parameter(value)
    }
}

impl From<MonitorChannel> for Quantity {
    fn from(value: MonitorChannel) -> Self {
        Quantity::Monitor(value)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Parameter(code) => fmt::Display::fmt(code, f),
            Quantity::Monitor(channel) => fmt::Display::fmt(channel, f),
        }
    }
}

/// Active quantities and their units, in reply field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterUnits {
    entries: Vec<(Quantity, &'static str)>,
}

impl ParameterUnits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a quantity. A quantity already present keeps its position.
    pub fn insert(&mut self, quantity: Quantity) {
        if !self.contains(&quantity) {
            self.entries.push((quantity, quantity.unit()));
        }
    }

    pub fn remove(&mut self, quantity: &Quantity) {
        self.entries.retain(|(q, _)| q != quantity);
    }

    pub fn contains(&self, quantity: &Quantity) -> bool {
        self.entries.iter().any(|(q, _)| q == quantity)
    }

    pub fn unit(&self, quantity: &Quantity) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(q, _)| q == quantity)
            .map(|(_, unit)| *unit)
    }

    pub fn quantities(&self) -> impl Iterator<Item = Quantity> + '_ {
        self.entries.iter().map(|(q, _)| *q)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Quantity, &'static str)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub quantity: Quantity,
    pub value: f64,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.quantity.unit();
        if unit.is_empty() {
            write!(f, "{}: {}", self.quantity, self.value)
        } else {
            write!(f, "{}: {} {}", self.quantity, self.value, unit)
        }
    }
}

/// One triggered measurement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurement {
    pub readings: Vec<Reading>,
}

impl Measurement {
    /// Pairs values with labels by position. Surplus on either side is dropped.
    pub fn pair(labels: &[Quantity], values: &[f64]) -> Self {
        Self {
            readings: labels
                .iter()
                .zip(values)
                .map(|(quantity, value)| Reading {
                    quantity: *quantity,
                    value: *value,
                })
                .collect(),
        }
    }

    pub fn get(&self, quantity: impl Into<Quantity>) -> Option<f64> {
        let quantity = quantity.into();
        self.readings
            .iter()
            .find(|r| r.quantity == quantity)
            .map(|r| r.value)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reading) in self.readings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            fmt::Display::fmt(reading, f)?;
        }
        Ok(())
    }
}
