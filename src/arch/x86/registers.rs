//! x86 (32-bit) register table.
//!
//! Identifiers are grouped in contiguous ranges per register class, so
//! classification is a range check. Flags are single-bit sub-registers of
//! `EFLAGS` and `MXCSR`.
use std::sync::{Arc, OnceLock};

use crate::register::{RegisterClass, RegisterDescriptor, RegisterId, RegisterSpec};

/// Single source of truth for the register set:
/// `NAME = id, PARENT, high bit, low bit, "name";`
macro_rules! registers {
    ($($register:ident = $id:literal, $parent:ident, $high:literal, $low:literal, $name:literal;)*) => {
        $(pub const $register: RegisterId = RegisterId($id);)*

        pub(crate) static DESCRIPTORS: &[RegisterDescriptor] = &[
            RegisterDescriptor::NONE,
            $(RegisterDescriptor::new($register, $parent, $high, $low, $name),)*
        ];
    };
}

registers! {
    EAX = 1, EAX, 31, 0, "eax";
    AX = 2, EAX, 15, 0, "ax";
    AH = 3, EAX, 15, 8, "ah";
    AL = 4, EAX, 7, 0, "al";
    EBX = 5, EBX, 31, 0, "ebx";
    BX = 6, EBX, 15, 0, "bx";
    BH = 7, EBX, 15, 8, "bh";
    BL = 8, EBX, 7, 0, "bl";
    ECX = 9, ECX, 31, 0, "ecx";
    CX = 10, ECX, 15, 0, "cx";
    CH = 11, ECX, 15, 8, "ch";
    CL = 12, ECX, 7, 0, "cl";
    EDX = 13, EDX, 31, 0, "edx";
    DX = 14, EDX, 15, 0, "dx";
    DH = 15, EDX, 15, 8, "dh";
    DL = 16, EDX, 7, 0, "dl";
    EDI = 17, EDI, 31, 0, "edi";
    DI = 18, EDI, 15, 0, "di";
    DIL = 19, EDI, 7, 0, "dil";
    ESI = 20, ESI, 31, 0, "esi";
    SI = 21, ESI, 15, 0, "si";
    SIL = 22, ESI, 7, 0, "sil";
    ESP = 23, ESP, 31, 0, "esp";
    SP = 24, ESP, 15, 0, "sp";
    SPL = 25, ESP, 7, 0, "spl";
    EBP = 26, EBP, 31, 0, "ebp";
    BP = 27, EBP, 15, 0, "bp";
    BPL = 28, EBP, 7, 0, "bpl";
    EIP = 29, EIP, 31, 0, "eip";
    IP = 30, EIP, 15, 0, "ip";
    EFLAGS = 31, EFLAGS, 31, 0, "eflags";
    MM0 = 32, MM0, 63, 0, "mm0";
    MM1 = 33, MM1, 63, 0, "mm1";
    MM2 = 34, MM2, 63, 0, "mm2";
    MM3 = 35, MM3, 63, 0, "mm3";
    MM4 = 36, MM4, 63, 0, "mm4";
    MM5 = 37, MM5, 63, 0, "mm5";
    MM6 = 38, MM6, 63, 0, "mm6";
    MM7 = 39, MM7, 63, 0, "mm7";
    MXCSR = 40, MXCSR, 31, 0, "mxcsr";
    XMM0 = 41, YMM0, 127, 0, "xmm0";
    XMM1 = 42, YMM1, 127, 0, "xmm1";
    XMM2 = 43, YMM2, 127, 0, "xmm2";
    XMM3 = 44, YMM3, 127, 0, "xmm3";
    XMM4 = 45, YMM4, 127, 0, "xmm4";
    XMM5 = 46, YMM5, 127, 0, "xmm5";
    XMM6 = 47, YMM6, 127, 0, "xmm6";
    XMM7 = 48, YMM7, 127, 0, "xmm7";
    YMM0 = 49, YMM0, 255, 0, "ymm0";
    YMM1 = 50, YMM1, 255, 0, "ymm1";
    YMM2 = 51, YMM2, 255, 0, "ymm2";
    YMM3 = 52, YMM3, 255, 0, "ymm3";
    YMM4 = 53, YMM4, 255, 0, "ymm4";
    YMM5 = 54, YMM5, 255, 0, "ymm5";
    YMM6 = 55, YMM6, 255, 0, "ymm6";
    YMM7 = 56, YMM7, 255, 0, "ymm7";
    CR0 = 57, CR0, 31, 0, "cr0";
    CR1 = 58, CR1, 31, 0, "cr1";
    CR2 = 59, CR2, 31, 0, "cr2";
    CR3 = 60, CR3, 31, 0, "cr3";
    CR4 = 61, CR4, 31, 0, "cr4";
    CR5 = 62, CR5, 31, 0, "cr5";
    CR6 = 63, CR6, 31, 0, "cr6";
    CR7 = 64, CR7, 31, 0, "cr7";
    CR8 = 65, CR8, 31, 0, "cr8";
    CR9 = 66, CR9, 31, 0, "cr9";
    CR10 = 67, CR10, 31, 0, "cr10";
    CR11 = 68, CR11, 31, 0, "cr11";
    CR12 = 69, CR12, 31, 0, "cr12";
    CR13 = 70, CR13, 31, 0, "cr13";
    CR14 = 71, CR14, 31, 0, "cr14";
    CR15 = 72, CR15, 31, 0, "cr15";
    DR0 = 73, DR0, 31, 0, "dr0";
    DR1 = 74, DR1, 31, 0, "dr1";
    DR2 = 75, DR2, 31, 0, "dr2";
    DR3 = 76, DR3, 31, 0, "dr3";
    DR6 = 77, DR6, 31, 0, "dr6";
    DR7 = 78, DR7, 31, 0, "dr7";
    AC = 79, EFLAGS, 18, 18, "ac";
    AF = 80, EFLAGS, 4, 4, "af";
    CF = 81, EFLAGS, 0, 0, "cf";
    DF = 82, EFLAGS, 10, 10, "df";
    ID = 83, EFLAGS, 21, 21, "id";
    IF = 84, EFLAGS, 9, 9, "if";
    NT = 85, EFLAGS, 14, 14, "nt";
    OF = 86, EFLAGS, 11, 11, "of";
    PF = 87, EFLAGS, 2, 2, "pf";
    RF = 88, EFLAGS, 16, 16, "rf";
    SF = 89, EFLAGS, 7, 7, "sf";
    TF = 90, EFLAGS, 8, 8, "tf";
    VIF = 91, EFLAGS, 19, 19, "vif";
    VIP = 92, EFLAGS, 20, 20, "vip";
    VM = 93, EFLAGS, 17, 17, "vm";
    ZF = 94, EFLAGS, 6, 6, "zf";
    IE = 95, MXCSR, 0, 0, "ie";
    DE = 96, MXCSR, 1, 1, "de";
    ZE = 97, MXCSR, 2, 2, "ze";
    OE = 98, MXCSR, 3, 3, "oe";
    UE = 99, MXCSR, 4, 4, "ue";
    PE = 100, MXCSR, 5, 5, "pe";
    DAZ = 101, MXCSR, 6, 6, "daz";
    IM = 102, MXCSR, 7, 7, "im";
    DM = 103, MXCSR, 8, 8, "dm";
    ZM = 104, MXCSR, 9, 9, "zm";
    OM = 105, MXCSR, 10, 10, "om";
    UM = 106, MXCSR, 11, 11, "um";
    PM = 107, MXCSR, 12, 12, "pm";
    RL = 108, MXCSR, 13, 13, "rl";
    RH = 109, MXCSR, 14, 14, "rh";
    FZ = 110, MXCSR, 15, 15, "fz";
    CS = 111, CS, 31, 0, "cs";
    DS = 112, DS, 31, 0, "ds";
    ES = 113, ES, 31, 0, "es";
    FS = 114, FS, 31, 0, "fs";
    GS = 115, GS, 31, 0, "gs";
    SS = 116, SS, 31, 0, "ss";
}

/// Identifiers in `[1, NUMBER_OF_REGISTERS)` are valid.
pub const NUMBER_OF_REGISTERS: usize = 117;

/// Width of a general-purpose register in bytes.
pub const GPR_SIZE: usize = 4;

pub fn is_gpr(id: RegisterId) -> bool {
    (EAX..=EFLAGS).contains(&id)
}

pub fn is_mmx(id: RegisterId) -> bool {
    (MM0..=MM7).contains(&id)
}

/// `MXCSR` and `XMM0`-`XMM7`.
pub fn is_sse(id: RegisterId) -> bool {
    (MXCSR..=XMM7).contains(&id)
}

pub fn is_avx256(id: RegisterId) -> bool {
    (YMM0..=YMM7).contains(&id)
}

pub fn is_control(id: RegisterId) -> bool {
    (CR0..=CR15).contains(&id)
}

pub fn is_debug(id: RegisterId) -> bool {
    (DR0..=DR7).contains(&id)
}

pub fn is_flag(id: RegisterId) -> bool {
    (AC..=FZ).contains(&id)
}

pub fn is_segment(id: RegisterId) -> bool {
    (CS..=SS).contains(&id)
}

pub fn classify(id: RegisterId) -> Option<RegisterClass> {
    if is_gpr(id) {
        Some(RegisterClass::Gpr)
    } else if is_mmx(id) || is_sse(id) {
        Some(RegisterClass::VectorLow)
    } else if is_avx256(id) {
        Some(RegisterClass::VectorHigh)
    } else if is_control(id) {
        Some(RegisterClass::Control)
    } else if is_debug(id) {
        Some(RegisterClass::Debug)
    } else if is_flag(id) {
        Some(RegisterClass::Flag)
    } else if is_segment(id) {
        Some(RegisterClass::Segment)
    } else {
        None
    }
}

/// The shared x86 register table.
pub fn spec() -> Arc<RegisterSpec> {
    static SPEC: OnceLock<Arc<RegisterSpec>> = OnceLock::new();
    SPEC.get_or_init(|| Arc::new(RegisterSpec::new(DESCRIPTORS)))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_dense() {
        assert_eq!(DESCRIPTORS.len(), NUMBER_OF_REGISTERS);
        for (index, descriptor) in DESCRIPTORS.iter().enumerate() {
            assert_eq!(descriptor.id().index(), index);
        }
    }

    #[test]
    fn every_register_is_classified() {
        for descriptor in spec().iter() {
            assert!(classify(descriptor.id()).is_some(), "{}", descriptor.name());
        }
        assert_eq!(classify(RegisterId::NONE), None);
        assert_eq!(classify(RegisterId(NUMBER_OF_REGISTERS as u16)), None);
    }

    #[test]
    fn flags_live_in_status_words() {
        let spec = spec();

        let zf = spec.lookup(ZF).unwrap();
        assert_eq!((zf.parent(), zf.low(), zf.high()), (EFLAGS, 6, 6));

        let fz = spec.lookup(FZ).unwrap();
        assert_eq!((fz.parent(), fz.low(), fz.high()), (MXCSR, 15, 15));

        assert_eq!(spec.parent_of(XMM3).unwrap().id(), YMM3);
        assert_eq!(spec.parent_of(AH).unwrap().id(), EAX);
        assert_eq!(spec.lookup_by_name("Eflags").unwrap().id(), EFLAGS);
    }
}
