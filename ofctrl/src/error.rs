/*
Copyright (c) 2022 VMware, Inc.
SPDX-License-Identifier: MIT
Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:
The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.
THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
 */
use thiserror::Error;

/// Errors the core itself raises. None of these ever abort a `run`/`put` cycle (see the crate's
/// module docs): the core is level-triggered and simply tries again next tick. They exist so that
/// a log line (or a unit test) has something concrete to point at.
#[derive(Debug, Error)]
pub enum Error {
    #[error("TLV table reply was malformed: {0}")]
    MalformedTlvReply(String),

    #[error("error reply for xid {xid:#x}: {detail}")]
    Negotiation { xid: u32, detail: String },

    #[error("failed to parse group spec {spec:?}: {source}")]
    GroupSpec {
        spec: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("inbound frame failed to decode: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
