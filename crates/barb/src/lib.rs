#![doc = include_str!("../../../README.md")]

mod bindings;
mod errors;
mod expressions;
mod host;
mod invoke;
mod object;
pub mod operators;
mod reduce;
mod run;
mod settings;
pub mod tracer;

pub use crate::{
    bindings::{BindingContents, Bindings, BoundNode},
    errors::{BarbExecutionError, ErrorKind, ReduceResult},
    expressions::{
        BinaryFn, ExprKind, ExprRep, InfixOp, Invokable, LambdaRep, PostfixOp, PrefixOp, Resolution, SourceSpan,
        UnaryFn,
    },
    host::{
        GetterFn, HostModel, HostResult, HostType, IndexedPropertyInfo, IndexerFn, MethodFn, MethodInfo, MethodList,
        PropertyInfo, ResolvedMember, StaticFn, StaticMember,
    },
    object::{ArrayObject, HostHandle, HostInstance, NumericSeq, Object, TypeTag},
    run::{reduce_nodes, CompiledExpr},
    settings::ReduceSettings,
};
