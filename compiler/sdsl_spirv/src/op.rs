//! SPIR-V opcode and operand enumerant tables.
//!
//! Only the subset the emitter produces is listed. Each opcode carries an
//! operand layout used by the disassembler:
//!
//! | char | operand |
//! |------|---------|
//! | `T`  | result type id |
//! | `R`  | result id |
//! | `i`  | id |
//! | `l`  | literal word |
//! | `s`  | literal string |
//! | `*`  | the previous kind repeats until the end |

macro_rules! opcodes {
    ($($variant:ident = $code:literal, $layout:literal;)*) => {
        /// A SPIR-V opcode.
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        pub enum Op {
            $($variant,)*
        }

        impl Op {
            #[inline]
            pub const fn code(self) -> u16 {
                match self {
                    $(Op::$variant => $code,)*
                }
            }

            pub fn from_code(code: u16) -> Option<Op> {
                match code {
                    $($code => Some(Op::$variant),)*
                    _ => None,
                }
            }

            /// Mnemonic without the `Op` prefix.
            pub fn name(self) -> &'static str {
                match self {
                    $(Op::$variant => stringify!($variant),)*
                }
            }

            pub(crate) fn layout(self) -> &'static str {
                match self {
                    $(Op::$variant => $layout,)*
                }
            }
        }
    };
}

opcodes! {
    Source = 3, "ll";
    Name = 5, "is";
    MemberName = 6, "ils";
    ExtInstImport = 11, "Rs";
    ExtInst = 12, "TRili*";
    MemoryModel = 14, "ll";
    EntryPoint = 15, "lisi*";
    ExecutionMode = 16, "il*";
    Capability = 17, "l";
    TypeVoid = 19, "R";
    TypeBool = 20, "R";
    TypeInt = 21, "Rll";
    TypeFloat = 22, "Rl";
    TypeVector = 23, "Ril";
    TypeMatrix = 24, "Ril";
    TypeImage = 25, "Rillllll";
    TypeSampler = 26, "R";
    TypeSampledImage = 27, "Ri";
    TypeArray = 28, "Rii";
    TypeStruct = 30, "Ri*";
    TypePointer = 32, "Rli";
    TypeFunction = 33, "Rii*";
    ConstantTrue = 41, "TR";
    ConstantFalse = 42, "TR";
    Constant = 43, "TRl*";
    ConstantComposite = 44, "TRi*";
    ConstantNull = 46, "TR";
    Function = 54, "TRli";
    FunctionParameter = 55, "TR";
    FunctionEnd = 56, "";
    FunctionCall = 57, "TRii*";
    Variable = 59, "TRli*";
    Load = 61, "TRi";
    Store = 62, "ii";
    AccessChain = 65, "TRii*";
    Decorate = 71, "ill*";
    MemberDecorate = 72, "illl*";
    VectorExtractDynamic = 77, "TRii";
    VectorShuffle = 79, "TRiil*";
    CompositeConstruct = 80, "TRi*";
    CompositeExtract = 81, "TRil*";
    CompositeInsert = 82, "TRiil*";
    SampledImage = 86, "TRii";
    ImageSampleImplicitLod = 87, "TRii";
    ImageSampleExplicitLod = 88, "TRiili*";
    ConvertFToU = 109, "TRi";
    ConvertFToS = 110, "TRi";
    ConvertSToF = 111, "TRi";
    ConvertUToF = 112, "TRi";
    Bitcast = 124, "TRi";
    SNegate = 126, "TRi";
    FNegate = 127, "TRi";
    IAdd = 128, "TRii";
    FAdd = 129, "TRii";
    ISub = 130, "TRii";
    FSub = 131, "TRii";
    IMul = 132, "TRii";
    FMul = 133, "TRii";
    UDiv = 134, "TRii";
    SDiv = 135, "TRii";
    FDiv = 136, "TRii";
    UMod = 137, "TRii";
    SRem = 138, "TRii";
    SMod = 139, "TRii";
    FRem = 140, "TRii";
    FMod = 141, "TRii";
    VectorTimesScalar = 142, "TRii";
    MatrixTimesScalar = 143, "TRii";
    VectorTimesMatrix = 144, "TRii";
    MatrixTimesVector = 145, "TRii";
    MatrixTimesMatrix = 146, "TRii";
    Dot = 148, "TRii";
    Any = 154, "TRi";
    All = 155, "TRi";
    LogicalEqual = 164, "TRii";
    LogicalNotEqual = 165, "TRii";
    LogicalOr = 166, "TRii";
    LogicalAnd = 167, "TRii";
    LogicalNot = 168, "TRi";
    Select = 169, "TRiii";
    IEqual = 170, "TRii";
    INotEqual = 171, "TRii";
    UGreaterThan = 172, "TRii";
    SGreaterThan = 173, "TRii";
    UGreaterThanEqual = 174, "TRii";
    SGreaterThanEqual = 175, "TRii";
    ULessThan = 176, "TRii";
    SLessThan = 177, "TRii";
    ULessThanEqual = 178, "TRii";
    SLessThanEqual = 179, "TRii";
    FOrdEqual = 180, "TRii";
    FOrdNotEqual = 182, "TRii";
    FOrdLessThan = 184, "TRii";
    FOrdGreaterThan = 186, "TRii";
    FOrdLessThanEqual = 188, "TRii";
    FOrdGreaterThanEqual = 190, "TRii";
    ShiftRightLogical = 194, "TRii";
    ShiftRightArithmetic = 195, "TRii";
    ShiftLeftLogical = 196, "TRii";
    BitwiseOr = 197, "TRii";
    BitwiseXor = 198, "TRii";
    BitwiseAnd = 199, "TRii";
    Not = 200, "TRi";
    DPdx = 207, "TRi";
    DPdy = 208, "TRi";
    LoopMerge = 246, "iil";
    SelectionMerge = 247, "il";
    Label = 248, "R";
    Branch = 249, "i";
    BranchConditional = 250, "iii";
    Kill = 252, "";
    Return = 253, "";
    ReturnValue = 254, "i";
    Unreachable = 255, "";
}

impl Op {
    /// Whether the opcode ends a block.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Op::Branch
                | Op::BranchConditional
                | Op::Kill
                | Op::Return
                | Op::ReturnValue
                | Op::Unreachable
        )
    }
}

pub const MAGIC: u32 = 0x0723_0203;
/// SPIR-V 1.0.
pub const VERSION: u32 = 0x0001_0000;

/// Storage classes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
#[repr(u32)]
pub enum StorageClass {
    UniformConstant = 0,
    Input = 1,
    Uniform = 2,
    Output = 3,
    Private = 6,
    Function = 7,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u32)]
pub enum Decoration {
    Block = 2,
    ColMajor = 5,
    ArrayStride = 6,
    MatrixStride = 7,
    BuiltIn = 11,
    Flat = 14,
    NonWritable = 24,
    Location = 30,
    Binding = 33,
    DescriptorSet = 34,
    Offset = 35,
    LinkageAttributes = 41,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u32)]
pub enum BuiltIn {
    Position = 0,
    FragCoord = 15,
    FrontFacing = 17,
    FragDepth = 22,
    WorkgroupId = 26,
    LocalInvocationId = 27,
    GlobalInvocationId = 28,
    LocalInvocationIndex = 29,
    VertexIndex = 42,
    InstanceIndex = 43,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u32)]
pub enum ExecutionModel {
    Vertex = 0,
    Fragment = 4,
    GLCompute = 5,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u32)]
pub enum ExecutionMode {
    OriginUpperLeft = 7,
    DepthReplacing = 12,
    LocalSize = 17,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
#[repr(u32)]
pub enum Capability {
    Matrix = 0,
    Shader = 1,
    Linkage = 5,
    Sampled1D = 43,
}

/// Image dimensionality.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u32)]
pub enum Dim {
    Dim1D = 0,
    Dim2D = 1,
    Dim3D = 2,
    Cube = 3,
}

pub const ADDRESSING_LOGICAL: u32 = 0;
pub const MEMORY_MODEL_GLSL450: u32 = 1;
pub const LINKAGE_EXPORT: u32 = 0;
pub const FUNCTION_CONTROL_NONE: u32 = 0;
pub const IMAGE_OPERANDS_LOD: u32 = 0x2;

pub const LOOP_CONTROL_UNROLL: u32 = 0x1;
pub const LOOP_CONTROL_DONT_UNROLL: u32 = 0x2;
pub const SELECTION_CONTROL_FLATTEN: u32 = 0x1;
pub const SELECTION_CONTROL_DONT_FLATTEN: u32 = 0x2;

/// `GLSL.std.450` extended instruction numbers.
pub mod glsl {
    pub const ROUND: u32 = 1;
    pub const TRUNC: u32 = 3;
    pub const F_ABS: u32 = 4;
    pub const S_ABS: u32 = 5;
    pub const F_SIGN: u32 = 6;
    pub const S_SIGN: u32 = 7;
    pub const FLOOR: u32 = 8;
    pub const CEIL: u32 = 9;
    pub const FRACT: u32 = 10;
    pub const SIN: u32 = 13;
    pub const COS: u32 = 14;
    pub const TAN: u32 = 15;
    pub const ASIN: u32 = 16;
    pub const ACOS: u32 = 17;
    pub const ATAN: u32 = 18;
    pub const ATAN2: u32 = 25;
    pub const POW: u32 = 26;
    pub const EXP: u32 = 27;
    pub const LOG: u32 = 28;
    pub const EXP2: u32 = 29;
    pub const LOG2: u32 = 30;
    pub const SQRT: u32 = 31;
    pub const INVERSE_SQRT: u32 = 32;
    pub const F_MIN: u32 = 37;
    pub const U_MIN: u32 = 38;
    pub const S_MIN: u32 = 39;
    pub const F_MAX: u32 = 40;
    pub const U_MAX: u32 = 41;
    pub const S_MAX: u32 = 42;
    pub const F_CLAMP: u32 = 43;
    pub const U_CLAMP: u32 = 44;
    pub const S_CLAMP: u32 = 45;
    pub const F_MIX: u32 = 46;
    pub const STEP: u32 = 48;
    pub const SMOOTH_STEP: u32 = 49;
    pub const LENGTH: u32 = 66;
    pub const DISTANCE: u32 = 67;
    pub const CROSS: u32 = 68;
    pub const NORMALIZE: u32 = 69;
    pub const REFLECT: u32 = 71;
}
