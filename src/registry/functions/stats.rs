// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Summary statistics functions
//!
//! `STATS_INIT` creates an accumulator that travels through expressions
//! as an opaque value. `STATS_ADD` updates it in place; the query functions
//! read it. An optional window size keeps only the most recent values.

use crate::model::{Context, OpaqueValue, Token, Value};
use crate::registry::function::{
    FunctionDescriptor, FunctionError, FunctionResult, StellarFunction, args,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::LazyLock;

const STATISTICS_LABEL: &str = "Statistics";

/// Running moments of a stream of values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    /// Number of values
    pub count: u64,
    /// Sum of values
    pub sum: f64,
    /// Sum of squared values
    pub sum_of_squares: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
}

impl Default for Moments {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_of_squares: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Moments {
    fn with(self, value: f64) -> Result<Self, String> {
        if !value.is_finite() {
            return Err(format!("cannot add non-finite value {value}"));
        }
        let next = Self {
            count: self.count + 1,
            sum: self.sum + value,
            sum_of_squares: self.sum_of_squares + value * value,
            min: self.min.min(value),
            max: self.max.max(value),
        };
        next.checked()
    }

    fn combine(self, other: Self) -> Result<Self, String> {
        Self {
            count: self.count + other.count,
            sum: self.sum + other.sum,
            sum_of_squares: self.sum_of_squares + other.sum_of_squares,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
        .checked()
    }

    fn checked(self) -> Result<Self, String> {
        if !self.sum.is_finite() {
            return Err("sum overflowed".to_string());
        }
        if !self.sum_of_squares.is_finite() {
            return Err("sum of squares overflowed".to_string());
        }
        Ok(self)
    }

    /// Arithmetic mean, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Bias corrected sample variance, `None` when empty
    pub fn variance(&self) -> Option<f64> {
        match self.count {
            0 => None,
            1 => Some(0.0),
            n => {
                let n = n as f64;
                let centered = self.sum_of_squares - self.sum * self.sum / n;
                Some((centered / (n - 1.0)).max(0.0))
            }
        }
    }
}

#[derive(Debug, Default)]
struct StatisticsState {
    window: Option<usize>,
    recent: VecDeque<f64>,
    moments: Moments,
}

/// Thread safe statistics accumulator
#[derive(Debug, Default)]
pub struct StatisticsAccumulator {
    state: Mutex<StatisticsState>,
}

impl StatisticsAccumulator {
    /// Create an accumulator; a window keeps only the last `n` values
    pub fn new(window: Option<usize>) -> Self {
        Self {
            state: Mutex::new(StatisticsState {
                window: window.filter(|n| *n > 0),
                ..StatisticsState::default()
            }),
        }
    }

    /// Add values; on failure the accumulator is left unchanged
    pub fn add_all(&self, values: &[f64]) -> Result<(), String> {
        let mut state = self.state.lock();
        match state.window {
            None => {
                let mut moments = state.moments;
                for value in values {
                    moments = moments.with(*value)?;
                }
                state.moments = moments;
            }
            Some(size) => {
                let mut recent = state.recent.clone();
                recent.extend(values);
                while recent.len() > size {
                    recent.pop_front();
                }
                state.moments = Self::recompute(&recent)?;
                state.recent = recent;
            }
        }
        Ok(())
    }

    fn recompute(values: &VecDeque<f64>) -> Result<Moments, String> {
        values
            .iter()
            .try_fold(Moments::default(), |moments, value| moments.with(*value))
    }

    /// Snapshot of the current moments
    pub fn moments(&self) -> Moments {
        self.state.lock().moments
    }

    /// Wrap into an opaque value
    pub fn into_value(self) -> Value {
        Value::Opaque(OpaqueValue::new(STATISTICS_LABEL, self))
    }
}

fn stats_arg<'a>(
    name: &str,
    args: &'a [Token],
    index: usize,
) -> FunctionResult<Option<&'a StatisticsAccumulator>> {
    match args::value(args, index) {
        None => Ok(None),
        Some(value) => value
            .as_opaque()
            .and_then(OpaqueValue::downcast_ref::<StatisticsAccumulator>)
            .map(Some)
            .ok_or_else(|| {
                FunctionError::argument_type(name, index, STATISTICS_LABEL, value.type_tag())
            }),
    }
}

/// Creates an accumulator
pub struct StatsInitFunction;

impl StellarFunction for StatsInitFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "STATS_INIT",
                "Initializes a statistics object",
                &["window_size - Optional number of most recent values to keep; 0 or absent keeps all"],
                "A statistics object",
            )
            .with_arity(0, Some(1))
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let window = args::integer(self.name(), args, 0)?.and_then(|n| usize::try_from(n).ok());
        Ok(Token::new(StatisticsAccumulator::new(window).into_value()))
    }
}

/// Adds values to an accumulator
pub struct StatsAddFunction;

impl StellarFunction for StatsAddFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "STATS_ADD",
                "Adds one or more numbers to a statistics object",
                &[
                    "stats - The statistics object; null creates a new one",
                    "value - One or more numbers to add",
                ],
                "The statistics object",
            )
            .with_arity(1, None)
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let mut values = Vec::with_capacity(args.len() - 1);
        for index in 1..args.len() {
            if let Some(value) = args::number(self.name(), args, index)? {
                values.push(value);
            }
        }

        let add = |stats: &StatisticsAccumulator| {
            stats
                .add_all(&values)
                .map_err(|message| FunctionError::state(self.name(), message))
        };
        match stats_arg(self.name(), args, 0)? {
            Some(stats) => {
                add(stats)?;
                Ok(args[0].clone())
            }
            None => {
                let stats = StatisticsAccumulator::default();
                add(&stats)?;
                Ok(Token::new(stats.into_value()))
            }
        }
    }
}

/// Merges accumulators
pub struct StatsMergeFunction;

impl StellarFunction for StatsMergeFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "STATS_MERGE",
                "Merges statistics objects",
                &["statistics - A list of statistics objects"],
                "A new statistics object covering every input",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let items = match args::value(args, 0) {
            None => return Ok(Token::null()),
            Some(Value::List(items)) => items,
            Some(other) => {
                return Err(FunctionError::argument_type(
                    self.name(),
                    0,
                    "List",
                    other.type_tag(),
                ));
            }
        };

        let mut merged = Moments::default();
        for item in items.iter().filter(|item| !item.is_null()) {
            let stats = item
                .as_opaque()
                .and_then(OpaqueValue::downcast_ref::<StatisticsAccumulator>)
                .ok_or_else(|| {
                    FunctionError::argument_type(self.name(), 0, STATISTICS_LABEL, item.type_tag())
                })?;
            merged = merged
                .combine(stats.moments())
                .map_err(|message| FunctionError::state(self.name(), message))?;
        }

        let result = StatisticsAccumulator::default();
        result.state.lock().moments = merged;
        Ok(Token::new(result.into_value()))
    }
}

/// Read-only query over an accumulator
pub struct StatsQueryFunction {
    descriptor: FunctionDescriptor,
    query: fn(&Moments) -> Option<Value>,
}

impl StatsQueryFunction {
    fn new(
        name: &str,
        description: &str,
        returns: &str,
        query: fn(&Moments) -> Option<Value>,
    ) -> Self {
        Self {
            descriptor: FunctionDescriptor::new(
                name,
                description,
                &["stats - The statistics object"],
                returns,
            ),
            query,
        }
    }

    /// Every query function
    pub fn all() -> Vec<Self> {
        vec![
            Self::new(
                "STATS_COUNT",
                "Calculates the count of the values accumulated",
                "The count as a long",
                |m| Some(Value::Long(i64::try_from(m.count).unwrap_or(i64::MAX))),
            ),
            Self::new(
                "STATS_SUM",
                "Calculates the sum of the values accumulated",
                "The sum as a double",
                |m| Some(Value::Double(m.sum)),
            ),
            Self::new(
                "STATS_MEAN",
                "Calculates the mean of the values accumulated",
                "The mean as a double, or null when empty",
                |m| m.mean().map(Value::Double),
            ),
            Self::new(
                "STATS_MIN",
                "Calculates the minimum of the values accumulated",
                "The minimum as a double, or null when empty",
                |m| (m.count > 0).then_some(Value::Double(m.min)),
            ),
            Self::new(
                "STATS_MAX",
                "Calculates the maximum of the values accumulated",
                "The maximum as a double, or null when empty",
                |m| (m.count > 0).then_some(Value::Double(m.max)),
            ),
            Self::new(
                "STATS_VARIANCE",
                "Calculates the sample variance of the values accumulated",
                "The variance as a double, or null when empty",
                |m| m.variance().map(Value::Double),
            ),
            Self::new(
                "STATS_SD",
                "Calculates the sample standard deviation of the values accumulated",
                "The standard deviation as a double, or null when empty",
                |m| m.variance().map(|v| Value::Double(v.sqrt())),
            ),
        ]
    }
}

impl StellarFunction for StatsQueryFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(stats_arg(self.name(), args, 0)?
            .and_then(|stats| (self.query)(&stats.moments()))
            .map(Token::new)
            .unwrap_or_default())
    }
}
