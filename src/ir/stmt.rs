// SPDX-License-Identifier: BSD-3-Clause
use std::fmt::Display;

use super::signature::MethodRef;
use super::{FieldId, MethodId, SubsigId, VarId};
use crate::name::Name;

/// Position of a statement, used to identify allocation and call sites.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct StmtRef {
    pub method: MethodId,
    pub index: u32,
}

impl StmtRef {
    #[inline]
    pub fn new(method: MethodId, index: usize) -> Self {
        StmtRef {
            method,
            index: index as u32,
        }
    }
}

impl Display for StmtRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}:{}", self.method.0, self.index)
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub enum InvokeKind {
    Static,
    Special,
    Virtual,
    Interface,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Literal {
    Null,
    Int(i64),
    String(Name),
    Class(Name),
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::String(s) => write!(f, "\"{s}\""),
            Literal::Class(c) => write!(f, "{c}.class"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Invoke {
    pub kind: InvokeKind,
    pub method: MethodRef,
    pub subsig: SubsigId,
    pub base: Option<VarId>,
    pub args: Vec<VarId>,
    pub result: Option<VarId>,
}

#[derive(Clone, Debug)]
pub enum Stmt {
    New {
        lhs: VarId,
        ty: Name,
    },
    NewArray {
        lhs: VarId,
        ty: Name,
        length: Option<VarId>,
    },
    Literal {
        lhs: VarId,
        value: Literal,
    },
    Copy {
        lhs: VarId,
        rhs: VarId,
    },
    Cast {
        lhs: VarId,
        rhs: VarId,
        ty: Name,
    },
    Load {
        lhs: VarId,
        base: VarId,
        field: FieldId,
    },
    Store {
        base: VarId,
        field: FieldId,
        rhs: VarId,
    },
    LoadStatic {
        lhs: VarId,
        field: FieldId,
    },
    StoreStatic {
        field: FieldId,
        rhs: VarId,
    },
    LoadArray {
        lhs: VarId,
        base: VarId,
        index: Option<VarId>,
    },
    StoreArray {
        base: VarId,
        index: Option<VarId>,
        rhs: VarId,
    },
    Invoke(Invoke),
    Return {
        value: Option<VarId>,
    },
}

impl Stmt {
    /// The variable this statement writes, if any.
    pub fn def(&self) -> Option<VarId> {
        // No `_` pattern to ensure this is updated if the type changes
        match self {
            Stmt::New { lhs, .. }
            | Stmt::NewArray { lhs, .. }
            | Stmt::Literal { lhs, .. }
            | Stmt::Copy { lhs, .. }
            | Stmt::Cast { lhs, .. }
            | Stmt::Load { lhs, .. }
            | Stmt::LoadStatic { lhs, .. }
            | Stmt::LoadArray { lhs, .. } => Some(*lhs),
            Stmt::Invoke(i) => i.result,
            Stmt::Store { .. }
            | Stmt::StoreStatic { .. }
            | Stmt::StoreArray { .. }
            | Stmt::Return { .. } => None,
        }
    }

    pub fn as_invoke(&self) -> Option<&Invoke> {
        match self {
            Stmt::Invoke(i) => Some(i),
            _ => None,
        }
    }
}
