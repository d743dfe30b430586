use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use concolic_arch::arch::x86::registers::{self, *};
use concolic_arch::hooks::HookConcrete;
use concolic_arch::operand::MemoryAccess;
use concolic_arch::register::{RegisterDescriptor, RegisterId};
use concolic_arch::state::Error;
use concolic_arch::value::mask;
use concolic_arch::{Config, Cpu, X86Cpu, U512};

use proptest::prelude::*;

fn u(value: u64) -> U512 {
    U512::from(value)
}

fn value_of_bits(bits: usize) -> impl Strategy<Value = U512> {
    prop::collection::vec(any::<u8>(), (bits + 7) / 8)
        .prop_map(move |bytes| U512::from_le_slice(&bytes) & mask(bits))
}

fn sub_registers() -> Vec<RegisterDescriptor> {
    registers::spec()
        .iter()
        .filter(|r| !r.is_parent())
        .copied()
        .collect()
}

fn sub_register_case() -> impl Strategy<Value = (RegisterDescriptor, U512, U512)> {
    let subs = sub_registers();
    (0..subs.len()).prop_flat_map(move |i| {
        let sub = subs[i];
        let parent_bits = registers::spec().parent_of(sub.id()).unwrap().bits();
        (Just(sub), value_of_bits(parent_bits), value_of_bits(sub.bits()))
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]
    #[test]
    fn sub_register_writes_preserve_parent_bits((sub, initial, value) in sub_register_case()) {
        let mut cpu = X86Cpu::new();
        let parent = sub.parent();

        cpu.set_register_value(parent, &initial).unwrap();
        cpu.set_register_value(sub.id(), &value).unwrap();

        let field = mask(sub.bits()) << sub.low();
        let expected = (initial & !field) | (value << sub.low());

        prop_assert_eq!(cpu.register_value(parent).unwrap(), expected);
        prop_assert_eq!(cpu.register_value(sub.id()).unwrap(), value);
    }

    #[test]
    fn memory_round_trip(
        address in any::<u64>(),
        size in prop::sample::select(vec![1usize, 2, 4, 8, 16, 32, 64]),
        bytes in prop::collection::vec(any::<u8>(), 64),
    ) {
        let mut cpu = X86Cpu::new();
        let access = MemoryAccess::new(address, size);
        let value = U512::from_le_slice(&bytes) & mask(size * 8);

        cpu.set_memory_value(&access, &value).unwrap();

        prop_assert_eq!(cpu.memory_value(&access).unwrap(), value);
        prop_assert!(cpu.is_memory_access_defined(&access));
    }

    #[test]
    fn undefined_memory_reads_zero(address in any::<u64>()) {
        let cpu = X86Cpu::new();

        prop_assert_eq!(cpu.memory_byte(address), 0);
        prop_assert!(!cpu.is_memory_defined(address));
    }

    #[test]
    fn forks_are_independent(value in any::<u32>(), address in any::<u64>(), byte in 1u8..) {
        let mut original = X86Cpu::new();
        original.set_register_value(EAX, &u(value as u64)).unwrap();

        let mut forked = original.fork();
        forked.set_register_value(EAX, &u(!value as u64)).unwrap();
        forked.set_memory_byte(address, byte);

        prop_assert_eq!(original.register_value(EAX).unwrap(), u(value as u64));
        prop_assert!(!original.is_memory_defined(address));

        original.set_register_value(EBX, &u(1)).unwrap();
        prop_assert_eq!(forked.register_value(EBX).unwrap(), U512::ZERO);
        prop_assert_eq!(forked.memory_byte(address), byte);
    }
}

#[test]
fn low_byte_aliasing() {
    let mut cpu = X86Cpu::new();

    cpu.set_register_value(EAX, &u(0xaabb_ccdd)).unwrap();
    cpu.set_register_value(AL, &u(0x11)).unwrap();
    assert_eq!(cpu.register_value(EAX).unwrap(), u(0xaabb_cc11));

    cpu.set_register_value(AH, &u(0x22)).unwrap();
    assert_eq!(cpu.register_value(AX).unwrap(), u(0x2211));
    assert_eq!(cpu.register_value(EAX).unwrap(), u(0xaabb_2211));
}

#[test]
fn xmm_aliases_low_half_of_ymm() {
    let mut cpu = X86Cpu::new();

    cpu.set_register_value(YMM1, &mask(256)).unwrap();
    cpu.set_register_value(XMM1, &U512::ZERO).unwrap();

    assert_eq!(cpu.register_value(YMM1).unwrap(), mask(256) & !mask(128));
    assert_eq!(cpu.register_value(YMM0).unwrap(), U512::ZERO);
}

#[test]
fn flag_bits_are_isolated() {
    let mut cpu = X86Cpu::new();

    cpu.set_register_value(ZF, &u(1)).unwrap();
    assert_eq!(cpu.register_value(EFLAGS).unwrap(), u(0x40));
    cpu.set_register_value(CF, &u(1)).unwrap();
    assert_eq!(cpu.register_value(EFLAGS).unwrap(), u(0x41));
    cpu.set_register_value(ZF, &u(0)).unwrap();
    assert_eq!(cpu.register_value(EFLAGS).unwrap(), u(0x01));

    cpu.set_register_value(EFLAGS, &u(0x800)).unwrap();
    assert_eq!(cpu.register_value(OF).unwrap(), u(1));
    assert_eq!(cpu.register_value(CF).unwrap(), U512::ZERO);

    cpu.set_register_value(DAZ, &u(1)).unwrap();
    assert_eq!(cpu.register_value(MXCSR).unwrap(), u(0x40));
}

#[test]
fn overflowing_writes_are_rejected() {
    let mut cpu = X86Cpu::new();

    assert!(matches!(
        cpu.set_register_value(AL, &u(256)),
        Err(Error::ValueTooLarge { bits: 8, .. })
    ));
    assert!(matches!(
        cpu.set_memory_value(&MemoryAccess::new(0x1000, 1), &u(256)),
        Err(Error::ValueTooLarge { bits: 8, .. })
    ));
    assert!(matches!(
        cpu.set_register_value(ZF, &u(2)),
        Err(Error::ValueTooLarge { bits: 1, .. })
    ));

    assert_eq!(cpu.register_value(EAX).unwrap(), U512::ZERO);
    assert!(!cpu.is_memory_defined(0x1000));
}

#[test]
fn invalid_registers() {
    let cpu = X86Cpu::new();

    assert!(matches!(
        cpu.register_value(RegisterId(1000)),
        Err(Error::InvalidRegister(RegisterId(1000)))
    ));
    assert!(matches!(
        cpu.register_by_name("rax"),
        Err(Error::InvalidRegisterName(_))
    ));
    assert_eq!(cpu.register_by_name("EAX").unwrap().id(), EAX);
}

#[test]
fn bulk_memory_and_clearing() {
    let mut cpu = X86Cpu::new();

    cpu.set_memory_area(0x4000, &[1, 2, 3, 4]);
    assert_eq!(cpu.memory_area(0x3fff, 6), vec![0, 1, 2, 3, 4, 0]);
    assert_eq!(
        cpu.memory_value(&MemoryAccess::new(0x4000, 4)).unwrap(),
        u(0x0403_0201)
    );

    cpu.clear_memory_access(&MemoryAccess::new(0x4001, 2));
    assert!(cpu.is_memory_defined(0x4000));
    assert!(!cpu.is_memory_defined(0x4001));
    assert!(!cpu.is_memory_defined(0x4002));
    assert_eq!(cpu.memory_area(0x4000, 4), vec![1, 0, 0, 4]);

    cpu.reset();
    assert!(!cpu.is_memory_defined(0x4000));
}

#[derive(Clone, Default)]
struct AccessCounter {
    register_reads: Arc<AtomicUsize>,
    register_writes: Arc<AtomicUsize>,
    memory_reads: Arc<AtomicUsize>,
    memory_writes: Arc<AtomicUsize>,
}

impl HookConcrete for AccessCounter {
    fn hook_register_read(&mut self, _register: &RegisterDescriptor) {
        self.register_reads.fetch_add(1, Ordering::SeqCst);
    }

    fn hook_register_write(&mut self, _register: &RegisterDescriptor, _value: &U512) {
        self.register_writes.fetch_add(1, Ordering::SeqCst);
    }

    fn hook_memory_read(&mut self, _access: &MemoryAccess) {
        self.memory_reads.fetch_add(1, Ordering::SeqCst);
    }

    fn hook_memory_write(&mut self, _access: &MemoryAccess, _value: &U512) {
        self.memory_writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn hooks_observe_accesses() {
    let counter = AccessCounter::default();
    let mut cpu = X86Cpu::new();
    cpu.state_mut().add_hook(counter.clone());

    cpu.set_register_value(EAX, &u(1)).unwrap();
    cpu.register_value(EAX).unwrap();
    cpu.register_value_with(EAX, false).unwrap();

    cpu.set_memory_value(&MemoryAccess::new(0, 4), &u(1)).unwrap();
    cpu.memory_value(&MemoryAccess::new(0, 4)).unwrap();
    cpu.memory_byte(0);

    assert_eq!(counter.register_writes.load(Ordering::SeqCst), 1);
    assert_eq!(counter.register_reads.load(Ordering::SeqCst), 1);
    assert_eq!(counter.memory_writes.load(Ordering::SeqCst), 1);
    assert_eq!(counter.memory_reads.load(Ordering::SeqCst), 2);

    // rejected writes are not observed
    let _ = cpu.set_register_value(AL, &u(256));
    assert_eq!(counter.register_writes.load(Ordering::SeqCst), 1);
}

#[test]
fn silent_accesses_skip_hooks() {
    let counter = AccessCounter::default();
    let mut cpu = X86Cpu::new();
    cpu.state_mut().add_hook(counter.clone());

    let access = MemoryAccess::new(0x100, 2);
    cpu.set_register_value_with(EAX, &u(0x1234), false).unwrap();
    cpu.set_memory_value_with(&access, &u(0xbeef), false).unwrap();
    cpu.set_memory_byte_with(0x200, 0x7f, false);
    cpu.set_memory_area_with(0x300, &[1, 2, 3], false);

    assert_eq!(cpu.register_value_with(AX, false).unwrap(), u(0x1234));
    assert_eq!(cpu.memory_value_with(&access, false).unwrap(), u(0xbeef));
    assert_eq!(cpu.memory_byte_with(0x200, false), 0x7f);
    assert_eq!(cpu.memory_area_with(0x300, 3, false), vec![1, 2, 3]);

    assert_eq!(counter.register_reads.load(Ordering::SeqCst), 0);
    assert_eq!(counter.register_writes.load(Ordering::SeqCst), 0);
    assert_eq!(counter.memory_reads.load(Ordering::SeqCst), 0);
    assert_eq!(counter.memory_writes.load(Ordering::SeqCst), 0);
}

#[test]
fn forked_hooks_are_toggled_independently() {
    let counter = AccessCounter::default();
    let mut cpu = X86Cpu::new();
    cpu.state_mut().add_hook(counter.clone());

    let mut forked = cpu.fork();
    forked.state_mut().callbacks_mut().disable();

    forked.memory_byte(0);
    assert_eq!(counter.memory_reads.load(Ordering::SeqCst), 0);

    cpu.memory_byte(0);
    assert_eq!(counter.memory_reads.load(Ordering::SeqCst), 1);
}

#[test]
fn callbacks_can_start_disabled() {
    let counter = AccessCounter::default();
    let mut cpu = X86Cpu::new_with(Config::default().with_callbacks(false));
    cpu.state_mut().add_hook(counter.clone());

    cpu.register_value(ESP).unwrap();
    assert_eq!(counter.register_reads.load(Ordering::SeqCst), 0);

    cpu.state_mut().callbacks_mut().enable();
    cpu.register_value(ESP).unwrap();
    assert_eq!(counter.register_reads.load(Ordering::SeqCst), 1);
}
