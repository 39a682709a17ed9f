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
//! C1: the real [`crate::channel::OfChannel`], backed by `ovs::rconn`'s reliable, auto-reconnecting
//! connection to a local switch.

use ovs::ofp_protocol::{Version, Versions};
use ovs::ofpbuf::Ofpbuf;
use ovs::rconn::{Rconn, DSCP_DEFAULT};

use crate::channel::OfChannel;

/// Wraps a single `rconn` targeting one switch, negotiated to OpenFlow 1.3 (the version every wire
/// encoder in [`crate::wire`] assumes).
pub struct Transport {
    rconn: Rconn,
}

impl Transport {
    pub fn new(target: &str) -> Transport {
        let mut rconn = Rconn::new(0, 0, DSCP_DEFAULT, Versions::from(Version::OFP13));
        rconn.connect(target, None);
        Transport { rconn }
    }

    pub fn wait(&mut self) {
        self.rconn.run_wait();
        self.rconn.recv_wait();
    }
}

impl OfChannel for Transport {
    fn send(&mut self, msg: Vec<u8>) {
        let buf = Ofpbuf::from_bytes(&msg);
        // A reliable rconn queues internally on a transient failure; nothing here is fatal enough
        // to propagate (§7: the core is level-triggered and simply retries next cycle).
        let _ = self.rconn.send(buf);
    }

    fn recv(&mut self) -> Option<Vec<u8>> {
        self.rconn.recv().map(Into::into)
    }

    fn is_connected(&self) -> bool {
        self.rconn.connected()
    }

    fn connection_generation(&self) -> u64 {
        self.rconn.connection_seqno() as u64
    }

    fn outstanding(&self) -> u32 {
        self.rconn.txqlen()
    }

    fn run_once(&mut self) {
        self.rconn.run();
    }

    fn current_target(&self) -> String {
        self.rconn.target()
    }

    fn protocol_version(&self) -> Option<u8> {
        if self.rconn.connected() {
            Some(self.rconn.version() as u8)
        } else {
            None
        }
    }
}
