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

//! Function and variable resolution
//!
//! Functions are looked up by name through a [`FunctionResolver`]; the
//! standard library lives under [`functions`]. Variables are supplied
//! per evaluation through a [`VariableResolver`].

pub mod function;
pub mod functions;
pub mod variable;

pub use function::{
    ClosureFunction, DescriptorViolation, FunctionDescriptor, FunctionError, FunctionRegistry,
    FunctionResolver, FunctionResult, StellarFunction, validate_descriptors,
};
pub use variable::{EmptyVariableResolver, FnVariableResolver, JsonVariableResolver, VariableResolver};

/// Create a registry holding the standard library
pub fn create_standard_registry() -> FunctionRegistry {
    FunctionRegistry::standard()
}
