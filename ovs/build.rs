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

//! Generates Rust bindings for the subset of `libopenvswitch` that the
//! `sys` module re-exports. Requires the `openvswitch` development
//! package (headers + `libopenvswitch.pc`) to be installed on the build
//! host, matched to the OVS release this agent is deployed against.

use std::env;
use std::path::PathBuf;

fn main() {
    let ovs = pkg_config::Config::new()
        .atleast_version("2.17")
        .probe("libopenvswitch")
        .expect("libopenvswitch.pc not found; install the OVS development package");

    let mut builder = bindgen::Builder::default()
        .header("wrapper.h")
        .allowlist_function("rconn_.*")
        .allowlist_function("ofpbuf_.*")
        .allowlist_function("ofpmsg_.*")
        .allowlist_function("ofpraw_.*")
        .allowlist_function("ofptype_.*")
        .allowlist_function("ofperr_.*")
        .allowlist_function("ofputil_.*")
        .allowlist_function("ofp_to_string")
        .allowlist_function("ds_.*")
        .allowlist_function("latch_.*")
        .allowlist_function("poll_.*")
        .allowlist_function("minimatch_destroy")
        .allowlist_type("ofpbuf")
        .allowlist_type("ofp_header")
        .allowlist_type("ofputil_flow_mod")
        .allowlist_type("ofputil_bundle_.*")
        .allowlist_type("ofp14_bundle_.*")
        .allowlist_type("ofp_version")
        .allowlist_type("ofp_flow_mod_command")
        .allowlist_type("ofputil_protocol")
        .allowlist_type("ofperr")
        .allowlist_var("DSCP_DEFAULT")
        .allowlist_var("OFPERR_OFS")
        .derive_default(true)
        .derive_eq(true)
        .generate_comments(true)
        .parse_callbacks(Box::new(bindgen::CargoCallbacks));

    for include in &ovs.include_paths {
        builder = builder.clang_arg(format!("-I{}", include.display()));
    }

    let bindings = builder.generate().expect("unable to generate OVS bindings");

    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
    bindings
        .write_to_file(out_path.join("bindings.rs"))
        .expect("failed to write bindings.rs");

    for lib in &ovs.libs {
        println!("cargo:rustc-link-lib=dylib={lib}");
    }
    for path in &ovs.link_paths {
        println!("cargo:rustc-link-search=native={}", path.display());
    }
}
