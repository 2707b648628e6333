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

//! Built-in function library

pub mod collection;
pub mod conversion;
pub mod datetime;
pub mod network;
pub mod stats;
pub mod string;

pub use collection::*;
pub use conversion::*;
pub use datetime::ToEpochTimestampFunction;
pub use network::*;
pub use stats::{
    Moments, StatisticsAccumulator, StatsAddFunction, StatsInitFunction, StatsMergeFunction,
    StatsQueryFunction,
};
pub use string::*;

use super::function::FunctionRegistry;

/// Register every built-in function
pub fn register_standard_functions(registry: &mut FunctionRegistry) {
    // String
    registry.register(ToUpperFunction);
    registry.register(ToLowerFunction);
    registry.register(TrimFunction);
    registry.register(StartsWithFunction);
    registry.register(EndsWithFunction);
    registry.register(JoinFunction);
    registry.register(SplitFunction);
    registry.register(RegexpMatchFunction);

    // Conversion
    registry.register(ToStringFunction);
    registry.register(ToIntegerFunction);
    registry.register(ToLongFunction);
    registry.register(ToFloatFunction);
    registry.register(ToDoubleFunction);

    // Collections and maps
    registry.register(LengthFunction);
    registry.register(IsEmptyFunction);
    registry.register(GetFunction);
    registry.register(GetFirstFunction);
    registry.register(GetLastFunction);
    registry.register(MapGetFunction);
    registry.register(MapExistsFunction);

    // Network
    registry.register(UrlToHostFunction);
    registry.register(UrlToPortFunction);
    registry.register(UrlToProtocolFunction);
    registry.register(UrlToPathFunction);
    registry.register(ProtocolToNameFunction);
    registry.register(InSubnetFunction);

    // Date
    registry.register(ToEpochTimestampFunction);

    // Statistics
    registry.register(StatsInitFunction);
    registry.register(StatsAddFunction);
    registry.register(StatsMergeFunction);
    for query in StatsQueryFunction::all() {
        registry.register(query);
    }
}
