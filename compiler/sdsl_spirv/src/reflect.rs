//! Reflection metadata describing a module's external interface.

use std::fmt;

use sdsl_mixer::Stage;

#[cfg(feature = "cache")]
use serde::{Deserialize, Serialize};

/// Pipeline stage, as recorded in reflection.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(Serialize, Deserialize))]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Compute,
}

impl From<Stage> for ShaderStage {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Vertex => ShaderStage::Vertex,
            Stage::Pixel => ShaderStage::Pixel,
            Stage::Compute => ShaderStage::Compute,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Pixel => "pixel",
            ShaderStage::Compute => "compute",
        })
    }
}

/// Register class of a resource binding.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(Serialize, Deserialize))]
pub enum BindingClass {
    ConstantBuffer,
    ShaderResourceView,
    Sampler,
}

impl fmt::Display for BindingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindingClass::ConstantBuffer => "cbuffer",
            BindingClass::ShaderResourceView => "srv",
            BindingClass::Sampler => "sampler",
        })
    }
}

/// A constant buffer, texture or sampler the runtime must bind.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(Serialize, Deserialize))]
pub struct ResourceBinding {
    pub name: String,
    pub class: BindingClass,
    /// Display form of the resource type, e.g. `Texture2D<float4>`.
    pub type_name: String,
    /// Stages whose code uses the binding; empty for library modules.
    pub stages: Vec<ShaderStage>,
    /// First register slot within the class.
    pub slot: u32,
    pub count: u32,
    /// `Binding` decoration; every binding is in descriptor set 0.
    pub binding: u32,
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(Serialize, Deserialize))]
pub struct ConstantBufferMember {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub type_name: String,
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(Serialize, Deserialize))]
pub struct ConstantBufferReflection {
    pub name: String,
    pub size: u32,
    pub members: Vec<ConstantBufferMember>,
}

/// A vertex input the input assembler feeds.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(Serialize, Deserialize))]
pub struct InputAttribute {
    pub semantic: String,
    pub location: u32,
    pub type_name: String,
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(Serialize, Deserialize))]
pub struct EntryPointReflection {
    pub name: String,
    pub stage: ShaderStage,
    pub workgroup: [u32; 3],
}

#[derive(Clone, Eq, PartialEq, Debug, Default)]
#[cfg_attr(feature = "cache", derive(Serialize, Deserialize))]
pub struct EffectReflection {
    pub bindings: Vec<ResourceBinding>,
    pub constant_buffers: Vec<ConstantBufferReflection>,
    pub input_attributes: Vec<InputAttribute>,
    pub entry_points: Vec<EntryPointReflection>,
}

impl EffectReflection {
    pub fn binding(&self, name: &str) -> Option<&ResourceBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn constant_buffer(&self, name: &str) -> Option<&ConstantBufferReflection> {
        self.constant_buffers.iter().find(|b| b.name == name)
    }
}

impl fmt::Display for EffectReflection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entry_points {
            write!(f, "entry {} {}", entry.stage, entry.name)?;
            if entry.stage == ShaderStage::Compute {
                let [x, y, z] = entry.workgroup;
                write!(f, " [{x}, {y}, {z}]")?;
            }
            writeln!(f)?;
        }
        for binding in &self.bindings {
            let stages: Vec<String> = binding.stages.iter().map(ToString::to_string).collect();
            writeln!(
                f,
                "binding {} {} {} slot={} count={} binding={} stages=[{}]",
                binding.class,
                binding.name,
                binding.type_name,
                binding.slot,
                binding.count,
                binding.binding,
                stages.join(", ")
            )?;
        }
        for buffer in &self.constant_buffers {
            writeln!(f, "cbuffer {} size={}", buffer.name, buffer.size)?;
            for member in &buffer.members {
                writeln!(
                    f,
                    "  {} {} offset={} size={}",
                    member.type_name, member.name, member.offset, member.size
                )?;
            }
        }
        for input in &self.input_attributes {
            writeln!(
                f,
                "input {} {} location={}",
                input.type_name, input.semantic, input.location
            )?;
        }
        Ok(())
    }
}
