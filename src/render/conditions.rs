//! Condition health classification

/// Node problem detector conditions that are healthy when `False`
const INVERTED_CONDITIONS: &[&str] = &[
    "CorruptDockerImage",
    "CorruptDockerOverlay2",
    "DockerContainerStartupFailure",
    "DockerHung",
    "Ext4Error",
    "Ext4Warning",
    "FilesystemIsReadOnly",
    "IOError",
    "KernelDeadlock",
    "KernelOops",
    "MemoryReadError",
    "OOMKilling",
    "ReadonlyFilesystem",
    "TaskHung",
    "UnregisterNetDevice",
    "FrequentDockerRestart",
    "FilesystemCorruptionProblem",
    "FrequentContainerdRestart",
    "FrequentKubeletRestart",
    "RebootScheduled",
    "KubeletProblem",
    "TerminateScheduled",
    "ContainerRuntimeProblem",
    "RedeployScheduled",
    "PreemptScheduled",
    "FreezeScheduled",
    "FrequentUnregisterNetDevice",
];

/// Whether a condition of `condition_type` reports trouble when `True`
pub fn has_inverted_polarity(condition_type: &str) -> bool {
    condition_type.ends_with("Pressure")
        || condition_type.ends_with("Unavailable")
        || condition_type.ends_with("Failure")
        || condition_type.starts_with("Non")
        || condition_type == "Failed"
        || INVERTED_CONDITIONS.contains(&condition_type)
}

/// Whether a status condition is in its healthy state
///
/// `Unknown`, and any status other than `True`/`False`, is never healthy.
pub fn is_status_condition_healthy(condition_type: &str, status: &str) -> bool {
    let healthy_status = if has_inverted_polarity(condition_type) {
        "False"
    } else {
        "True"
    };
    status == healthy_status
}
