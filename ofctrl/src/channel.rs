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
//! The interface C2 and C5 use to talk to the switch, factored out of [`crate::transport`] so that
//! tests can exercise the state machines against an in-memory fake instead of a real `rconn`.

/// A single connection to the switch, reliable and auto-reconnecting underneath (§2's C1). Every
/// method here is non-blocking: `run_once` drives the connection's internal state forward, and
/// `recv` drains whatever has already arrived.
pub trait OfChannel {
    /// Sends one already-encoded OpenFlow message. Queued if the connection is momentarily down.
    fn send(&mut self, msg: Vec<u8>);

    /// Returns the next queued inbound message, if any, without blocking.
    fn recv(&mut self) -> Option<Vec<u8>>;

    fn is_connected(&self) -> bool;

    /// Monotonically increases each time the underlying connection is replaced (reconnect), so
    /// callers can detect "everything we assumed about switch state is now void" (§4.2, §9).
    fn connection_generation(&self) -> u64;

    /// Number of sent messages not yet known to have reached the switch, used for back-pressure
    /// (§4.5, §7).
    fn outstanding(&self) -> u32;

    /// Drives connect/reconnect bookkeeping and socket I/O forward by one step.
    fn run_once(&mut self);

    fn current_target(&self) -> String;

    /// The negotiated OpenFlow wire version, once connected.
    fn protocol_version(&self) -> Option<u8>;
}
