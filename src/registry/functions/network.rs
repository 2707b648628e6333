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

//! URL, protocol and address functions

use crate::model::{Context, Token, Value};
use crate::registry::function::{
    FunctionDescriptor, FunctionError, FunctionResult, StellarFunction, args,
};
use ipnet::IpNet;
use std::net::IpAddr;
use std::sync::LazyLock;
use url::Url;

/// IANA assigned internet protocol numbers, sorted by number
const PROTOCOLS: &[(u8, &str)] = &[
    (0, "HOPOPT"),
    (1, "ICMP"),
    (2, "IGMP"),
    (3, "GGP"),
    (4, "IPv4"),
    (5, "ST"),
    (6, "TCP"),
    (7, "CBT"),
    (8, "EGP"),
    (9, "IGP"),
    (12, "PUP"),
    (17, "UDP"),
    (20, "HMP"),
    (22, "XNS-IDP"),
    (27, "RDP"),
    (29, "ISO-TP4"),
    (33, "DCCP"),
    (41, "IPv6"),
    (43, "IPv6-Route"),
    (44, "IPv6-Frag"),
    (46, "RSVP"),
    (47, "GRE"),
    (50, "ESP"),
    (51, "AH"),
    (58, "IPv6-ICMP"),
    (59, "IPv6-NoNxt"),
    (60, "IPv6-Opts"),
    (88, "EIGRP"),
    (89, "OSPF"),
    (94, "IPIP"),
    (97, "ETHERIP"),
    (98, "ENCAP"),
    (103, "PIM"),
    (108, "IPComp"),
    (112, "VRRP"),
    (115, "L2TP"),
    (132, "SCTP"),
    (136, "UDPLite"),
    (137, "MPLS-in-IP"),
];

fn protocol_name(number: i64) -> Option<&'static str> {
    let number = u8::try_from(number).ok()?;
    PROTOCOLS
        .binary_search_by_key(&number, |(n, _)| *n)
        .ok()
        .map(|index| PROTOCOLS[index].1)
}

fn url_arg(name: &str, args: &[Token]) -> FunctionResult<Option<Url>> {
    Ok(args::string(name, args, 0)?.and_then(|text| match Url::parse(text) {
        Ok(url) => Some(url),
        Err(e) => {
            log::trace!("{name}: unable to parse '{text}' as a URL: {e}");
            None
        }
    }))
}

/// Host component of a URL
pub struct UrlToHostFunction;

impl StellarFunction for UrlToHostFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "URL_TO_HOST",
                "Extract the hostname from a URL",
                &["url - URL in string form"],
                "The hostname, or null if the URL cannot be parsed",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(url_arg(self.name(), args)?
            .and_then(|url| url.host_str().map(Token::from))
            .unwrap_or_default())
    }
}

/// Port of a URL, defaulted by scheme
pub struct UrlToPortFunction;

impl StellarFunction for UrlToPortFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "URL_TO_PORT",
                "Extract the port from a URL, using the scheme default when absent",
                &["url - URL in string form"],
                "The port as an integer, or null if unknown",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(url_arg(self.name(), args)?
            .and_then(|url| url.port_or_known_default())
            .map(|port| Token::from(i32::from(port)))
            .unwrap_or_default())
    }
}

/// Scheme of a URL
pub struct UrlToProtocolFunction;

impl StellarFunction for UrlToProtocolFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "URL_TO_PROTOCOL",
                "Extract the protocol from a URL",
                &["url - URL in string form"],
                "The protocol, or null if the URL cannot be parsed",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(url_arg(self.name(), args)?
            .map(|url| Token::from(url.scheme()))
            .unwrap_or_default())
    }
}

/// Path of a URL
pub struct UrlToPathFunction;

impl StellarFunction for UrlToPathFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "URL_TO_PATH",
                "Extract the path from a URL",
                &["url - URL in string form"],
                "The path, or null if the URL cannot be parsed",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(url_arg(self.name(), args)?
            .map(|url| Token::from(url.path()))
            .unwrap_or_default())
    }
}

/// Protocol number to name
pub struct ProtocolToNameFunction;

impl StellarFunction for ProtocolToNameFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "PROTOCOL_TO_NAME",
                "Convert the IANA protocol number to the protocol name",
                &["protocol - IANA protocol number as an integer or string"],
                "The protocol name; unknown input is returned unchanged",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let number = match args::value(args, 0) {
            None => return Ok(Token::null()),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(other) => other.as_i64(),
        };
        Ok(number
            .and_then(protocol_name)
            .map_or_else(|| args[0].clone(), Token::from))
    }
}

/// Address containment in one or more CIDR blocks
pub struct InSubnetFunction;

impl StellarFunction for InSubnetFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "IN_SUBNET",
                "Returns true if an IP is within one of the given subnets",
                &[
                    "ip - IP address in string form",
                    "cidr - One or more subnets in CIDR notation",
                ],
                "True if the IP address is within at least one of the subnets",
            )
            .with_arity(2, None)
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let Some(address) = args::string(self.name(), args, 0)?
            .and_then(|text| text.trim().parse::<IpAddr>().ok())
        else {
            return Ok(Token::boolean(false));
        };

        for index in 1..args.len() {
            let Some(cidr) = args::string(self.name(), args, index)? else {
                continue;
            };
            let net: IpNet = cidr.trim().parse().map_err(|e: ipnet::AddrParseError| {
                FunctionError::evaluation(self.name(), format!("invalid CIDR '{cidr}': {e}"))
            })?;
            if net.contains(&address) {
                return Ok(Token::boolean(true));
            }
        }
        Ok(Token::boolean(false))
    }
}
