#![doc = include_str!("../../../README.md")]
// first so the arena types are visible to every payload module
pub mod heap;

mod args;
pub mod attr;
pub mod call;
pub mod compare;
mod exception_private;
pub mod frame;
pub mod hash;
pub mod number;
pub mod object_protocol;
mod resource;
mod runtime;
pub mod signature;
pub mod slot;
mod thread_context;
pub mod tracer;
pub mod types;
mod value;

pub use crate::{
    args::ArgValues,
    attr::DescriptorKind,
    compare::Comparison,
    exception_private::{ExcType, RunError, RunResult, SimpleException},
    frame::{Code, Evaluator, FnEvaluator, Frame},
    heap::{HeapId, HeapStats},
    number::BinaryOp,
    resource::{
        DEFAULT_MAX_RECURSION_DEPTH, DEFAULT_RECURSION_HEADROOM, MAX_INHERITANCE_DEPTH, ResourceError,
        ResourceLimits,
    },
    runtime::Runtime,
    signature::{ParamShape, ParamShapeBuilder},
    slot::{Slot, SlotFn, SlotSignature},
    thread_context::{FrameRecord, ThreadContext},
    tracer::{
        NoopTracer, ProfilingReport, ProfilingTracer, RecordingTracer, RuntimeTracer, StderrTracer, TraceEvent,
    },
    types::{Dict, GetSetDef, MemberDef, MethodDef, MethodStyle, Shape, TypeFlags, TypeId, TypeObject, TypeSpec},
    value::Value,
};
