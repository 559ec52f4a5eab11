// Copyright (c) 2024 Mike Tsao

//! The reserved events the dispatcher acts on itself instead of looking them
//! up in the binding table.

use super::Dispatcher;
use crate::{
    error::DispatchError,
    events::{Event, EventType, REFERENCE_FIELD},
    variables::{Value, VarHandle},
};
use std::sync::atomic::Ordering;

/// The dynamic range of a fader, in decibels. A fader at 1.0 is unity gain,
/// and one at 0.0 is this far below it (and then silenced).
pub const FADER_RANGE_DB: f32 = 60.0;

/// Converts a fader position to a linear gain. Positions are logarithmic:
/// 1.0 is unity, each step down attenuates by a fixed number of decibels, and
/// anything at or below zero is silence. Positions above 1.0 boost.
pub fn fader_to_linear(fader: f32) -> f32 {
    if fader <= 0.0 {
        0.0
    } else {
        10.0f32.powf((fader - 1.0) * FADER_RANGE_DB / 20.0)
    }
}

impl Dispatcher {
    pub(super) fn handle_control(&self, event: &Event) -> Result<(), DispatchError> {
        let event_type = event.event_type();
        let get = |name: &str| self.registry.get(event, name).unwrap_or_default();
        let reference = |name: &'static str| -> Result<VarHandle, DispatchError> {
            get(name)
                .as_ref_handle()
                .ok_or(DispatchError::MissingReference {
                    event: event_type,
                    field: name,
                })
        };
        let number = |handle: VarHandle, name: &'static str| {
            self.vars
                .value(handle)
                .as_i64()
                .ok_or(DispatchError::InvalidValue(name))
        };

        match event_type {
            EventType::SetVariable => {
                let var = reference(REFERENCE_FIELD)?;
                let value = get("value");
                if get("maxjumpcheck").as_i64().unwrap_or_default() != 0 {
                    let maxjump = get("maxjump").as_f64().unwrap_or_default();
                    if let (Some(new), Some(current)) =
                        (value.as_f64(), self.vars.value(var).as_f64())
                    {
                        if (new - current).abs() > maxjump {
                            tracing::trace!(
                                "refusing jump of {} on {}",
                                new - current,
                                self.vars.describe(var)
                            );
                            return Ok(());
                        }
                    }
                }
                self.vars.set(var, value)?;
            }
            EventType::ToggleVariable => {
                let var = reference(REFERENCE_FIELD)?;
                let max = get("maxvalue").as_i64().unwrap_or_default();
                let min = get("minvalue").as_i64().unwrap_or_default();
                let next = number(var, REFERENCE_FIELD)?
                    .checked_add(1)
                    .filter(|next| *next <= max)
                    .unwrap_or(min);
                self.vars.set(var, Value::Long(next))?;
            }
            EventType::SplitVariableMsbLsb => {
                let v = number(reference(REFERENCE_FIELD)?, REFERENCE_FIELD)?;
                self.vars
                    .set(reference("msb")?, Value::Int(((v >> 8) & 0xff) as i32))?;
                self.vars.set(reference("lsb")?, Value::Int((v & 0xff) as i32))?;
            }
            EventType::LogFaderToLinear => {
                let var = reference(REFERENCE_FIELD)?;
                let scale = get("scale")
                    .as_f64()
                    .filter(|s| *s != 0.0)
                    .ok_or(DispatchError::InvalidValue("scale"))?;
                let fader = self
                    .vars
                    .value(reference("fadervar")?)
                    .as_f64()
                    .ok_or(DispatchError::InvalidValue("fadervar"))?;
                self.vars
                    .set(var, Value::Float(fader_to_linear((fader / scale) as f32)))?;
            }
            EventType::SetDebugMode => {
                let on = get("debug").as_i64().unwrap_or_default() != 0;
                self.debug.store(on, Ordering::Relaxed);
                tracing::info!("debug mode {}", if on { "on" } else { "off" });
            }
            EventType::AdjustMidiTranspose => {
                let adjust = get("adjust").as_i64().unwrap_or_default();
                let current = self.transpose.get().as_i64().unwrap_or_default();
                self.transpose.set(Value::Long(current + adjust));
            }
            _ => {}
        }
        Ok(())
    }
}
