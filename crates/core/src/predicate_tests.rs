// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::{Process, SockInfo};
use yare::parameterized;

fn predicate() -> Predicate {
    Predicate::new(PodKey::new("a", "default"))
}

fn exec(binary: &str, arguments: &str) -> Event {
    Event::ProcessExec {
        process: Some(Process {
            binary: binary.to_string(),
            arguments: arguments.to_string(),
            pod: Some(PodKey::new("a", "default")),
            start_time: None,
        }),
        parent: None,
    }
}

fn kprobe(function_name: &str, args: Vec<KprobeArg>) -> Event {
    Event::ProcessKprobe {
        process: Some(Process {
            binary: "/bin/sh".to_string(),
            arguments: String::new(),
            pod: Some(PodKey::new("a", "default")),
            start_time: None,
        }),
        function_name: function_name.to_string(),
        args,
    }
}

#[test]
fn exec_counts_process_and_command() {
    let mut p = predicate();
    p.fold(&exec("/bin/sh", "-c ls")).unwrap();

    assert_eq!(p.processes_executed.get("/bin/sh"), Some(&1));
    assert_eq!(p.commands_executed["/bin/sh"].get("-c ls"), Some(&1));
    assert!(p.files_written.is_empty());
    assert!(p.files_read.is_empty());
    assert!(p.files_opened.is_empty());
    assert!(p.filesystems_mounted.is_empty());
    assert!(p.tcp_connections.is_empty());
    assert!(p.uids_set.is_empty());
    assert!(p.materials.is_empty());
}

#[test]
fn repeated_identical_commands_deduplicate_by_argv() {
    let mut p = predicate();
    p.fold(&exec("/bin/sh", "-c ls")).unwrap();
    p.fold(&exec("/bin/sh", "-c ls")).unwrap();
    p.fold(&exec("/bin/sh", "-c pwd")).unwrap();

    assert_eq!(p.processes_executed.get("/bin/sh"), Some(&3));
    assert_eq!(p.commands_executed["/bin/sh"].get("-c ls"), Some(&2));
    assert_eq!(p.commands_executed["/bin/sh"].get("-c pwd"), Some(&1));
}

#[test]
fn write_kprobes_count_per_path() {
    let mut p = predicate();
    for _ in 0..3 {
        p.fold(&kprobe("__x64_sys_write", vec![KprobeArg::File { path: "/out".into() }]))
            .unwrap();
    }
    assert_eq!(p.files_written.get("/out"), Some(&3));
}

#[test]
fn read_kprobes_count_per_path() {
    let mut p = predicate();
    p.fold(&kprobe("__x64_sys_read", vec![KprobeArg::File { path: "/in".into() }])).unwrap();
    assert_eq!(p.files_read.get("/in"), Some(&1));
}

#[test]
fn fd_install_reads_the_second_argument() {
    let mut p = predicate();
    p.fold(&kprobe(
        "fd_install",
        vec![KprobeArg::Int { value: 3 }, KprobeArg::File { path: "/opened".into() }],
    ))
    .unwrap();
    assert_eq!(p.files_opened.get("/opened"), Some(&1));

    // A file in the first slot only is not an open.
    p.fold(&kprobe("fd_install", vec![KprobeArg::File { path: "/wrong".into() }])).unwrap();
    assert!(!p.files_opened.contains_key("/wrong"));
}

#[test]
fn mounts_append_in_order() {
    let mut p = predicate();
    p.fold(&kprobe(
        "__x64_sys_mount",
        vec![KprobeArg::Str { value: "tmpfs".into() }, KprobeArg::Str { value: "/tmp".into() }],
    ))
    .unwrap();
    p.fold(&kprobe(
        "__x64_sys_mount",
        vec![KprobeArg::Str { value: "proc".into() }, KprobeArg::Str { value: "/proc".into() }],
    ))
    .unwrap();

    assert_eq!(
        p.filesystems_mounted,
        vec![
            FilesystemMount { source: "tmpfs".into(), destination: "/tmp".into() },
            FilesystemMount { source: "proc".into(), destination: "/proc".into() },
        ]
    );
}

#[test]
fn setuid_counts_per_uid() {
    let mut p = predicate();
    p.fold(&kprobe("__x64_sys_setuid", vec![KprobeArg::Int { value: 0 }])).unwrap();
    p.fold(&kprobe("__x64_sys_setuid", vec![KprobeArg::Int { value: 0 }])).unwrap();
    p.fold(&kprobe("__x64_sys_setuid", vec![KprobeArg::Int { value: 1000 }])).unwrap();

    assert_eq!(p.uids_set.get(&0), Some(&2));
    assert_eq!(p.uids_set.get(&1000), Some(&1));
}

#[test]
fn tcp_connects_append_the_four_tuple() {
    let mut p = predicate();
    p.fold(&kprobe(
        "tcp_connect",
        vec![KprobeArg::Sock {
            value: SockInfo {
                saddr: "10.0.0.1".into(),
                daddr: "10.0.0.2".into(),
                sport: 43210,
                dport: 443,
            },
        }],
    ))
    .unwrap();

    assert_eq!(
        p.tcp_connections,
        vec![TcpConnection {
            socket_address: "10.0.0.1".into(),
            socket_port: 43210,
            destination_address: "10.0.0.2".into(),
            destination_port: 443,
        }]
    );
}

#[parameterized(
    write_no_args = { "__x64_sys_write", vec![] },
    write_wrong_kind = { "__x64_sys_write", vec![KprobeArg::Str { value: "/out".into() }] },
    read_unknown_arg = { "__x64_sys_read", vec![KprobeArg::Unknown] },
    fd_install_missing_second = { "fd_install", vec![KprobeArg::Int { value: 3 }] },
    mount_missing_destination = { "__x64_sys_mount", vec![KprobeArg::Str { value: "tmpfs".into() }] },
    setuid_no_args = { "__x64_sys_setuid", vec![] },
    setuid_negative = { "__x64_sys_setuid", vec![KprobeArg::Int { value: -1 }] },
    tcp_connect_no_sock = { "tcp_connect", vec![KprobeArg::Int { value: 4 }] },
    unlisted_function = { "__x64_sys_close", vec![KprobeArg::Int { value: 3 }] },
)]
fn malformed_or_unlisted_kprobes_leave_counters_untouched(function_name: &str, args: Vec<KprobeArg>) {
    let mut p = predicate();
    p.fold(&kprobe(function_name, args)).unwrap();
    assert_eq!(p, predicate());
}

#[test]
fn exit_is_a_no_op_with_process_context() {
    let mut p = predicate();
    let exit = Event::ProcessExit {
        process: Some(Process {
            binary: "/bin/sh".into(),
            arguments: String::new(),
            pod: Some(PodKey::new("a", "default")),
            start_time: None,
        }),
        parent: None,
    };
    p.fold(&exit).unwrap();
    assert_eq!(p, predicate());
}

#[parameterized(
    exec = { Event::ProcessExec { process: None, parent: None }, "process:exec" },
    exit = { Event::ProcessExit { process: None, parent: None }, "process:exit" },
    kprobe = {
        Event::ProcessKprobe { process: None, function_name: "tcp_connect".into(), args: vec![] },
        "process:kprobe"
    },
)]
fn missing_process_is_malformed(event: Event, kind: &'static str) {
    let mut p = predicate();
    assert_eq!(p.fold(&event), Err(MalformedEvent { kind }));
    assert_eq!(p, predicate());
}

#[test]
fn ignored_kinds_fold_as_no_ops() {
    let mut p = predicate();
    p.fold(&Event::ProcessTracepoint { process: None }).unwrap();
    p.fold(&Event::ProcessDns { process: None }).unwrap();
    assert_eq!(p, predicate());
}

#[test]
fn folding_is_deterministic_for_a_fixed_sequence() {
    let events = vec![
        exec("/bin/sh", "-c ls"),
        kprobe("__x64_sys_write", vec![KprobeArg::File { path: "/out".into() }]),
        exec("/usr/bin/make", "all"),
        kprobe("__x64_sys_setuid", vec![KprobeArg::Int { value: 0 }]),
    ];

    let mut a = predicate();
    let mut b = predicate();
    for event in &events {
        a.fold(event).unwrap();
        b.fold(event).unwrap();
    }
    assert_eq!(a, b);
    assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
}

#[test]
fn counts_are_monotonic_under_additional_events() {
    let mut p = predicate();
    p.fold(&exec("/bin/sh", "-c ls")).unwrap();
    let before = p.processes_executed["/bin/sh"];
    p.fold(&exec("/bin/sh", "-c ls")).unwrap();
    assert!(p.processes_executed["/bin/sh"] > before);
}

#[test]
fn serialization_round_trips() {
    let mut p = predicate();
    p.fold(&exec("/bin/sh", "-c ls")).unwrap();
    p.fold(&kprobe("__x64_sys_write", vec![KprobeArg::File { path: "/out".into() }])).unwrap();
    p.fold(&kprobe("__x64_sys_setuid", vec![KprobeArg::Int { value: 1000 }])).unwrap();
    p.materials.insert("img".into(), [("sha256".to_string(), "deadbeef".to_string())].into());

    let json = serde_json::to_string(&p).unwrap();
    let back: Predicate = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
}

#[test]
fn empty_aggregates_serialize_compactly() {
    let value = serde_json::to_value(predicate()).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.keys().collect::<Vec<_>>(), vec!["pod"]);
}
