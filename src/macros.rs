/// Implements [`crate::regs::Reg`] for a one-byte bitfield register struct,
/// optionally marking it as accepting the BIT MODIFY instruction.
macro_rules! impl_reg {
    ($ty:ident: $addr:ident) => {
        impl crate::regs::Reg for $ty {
            const ADDRESS: crate::regs::Register = crate::regs::Register::$addr;

            fn read(byte: u8) -> Self {
                Self::from_bytes([byte])
            }

            fn write(self) -> u8 {
                self.into_bytes()[0]
            }
        }
    };
    ($ty:ident: $addr:ident, bit_modifiable) => {
        impl_reg!($ty: $addr);

        impl crate::regs::BitModifiable for $ty {}
    };
}

pub(crate) use impl_reg;
