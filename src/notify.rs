use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::{Error, InterruptSource, State, Sx8634};

/// Maximum number of subscribers per device.
pub const MAX_SUBSCRIBERS: usize = 4;

/// Receives every handled interrupt, after the input consumer has been
/// served.
///
/// Called synchronously from the interrupt path, so implementations should
/// return quickly. Use interior mutability to record state. The callback has
/// no access to the bus: a consumer that needs to touch registers (such as a
/// backlight on the GPP outputs) records the flags here and performs the
/// access through the driver once [`Sx8634::handle_interrupt`] returns.
///
/// Subscribers are identified by address. Two values of the same zero sized
/// type cannot be told apart.
pub trait Subscriber {
  fn notify(&self, pending: InterruptSource, state: &State);
}

/// Ordered, fixed capacity list of subscribers.
pub(crate) struct Notifier<'a> {
  slots: [Option<&'a dyn Subscriber>; MAX_SUBSCRIBERS],
}

impl<'a> Notifier<'a> {
  pub(crate) const fn new() -> Self {
    Self { slots: [None; MAX_SUBSCRIBERS] }
  }

  /// Append `subscriber`. Returns `false` if every slot is taken.
  fn register(&mut self, subscriber: &'a dyn Subscriber) -> bool {
    match self.slots.iter_mut().find(|s| s.is_none()) {
      Some(slot) => {
        *slot = Some(subscriber);
        true
      }
      None => false,
    }
  }

  /// Remove `subscriber`, keeping the order of the others.
  fn unregister(&mut self, subscriber: &dyn Subscriber) -> bool {
    let Some(index) = self.slots.iter().position(|s| s.is_some_and(|s| same(s, subscriber))) else {
      return false;
    };
    self.slots[index..].rotate_left(1);
    self.slots[MAX_SUBSCRIBERS - 1] = None;
    true
  }

  pub(crate) fn notify(&self, pending: InterruptSource, state: &State) {
    for subscriber in self.slots.iter().map_while(|s| *s) {
      subscriber.notify(pending, state);
    }
  }
}

fn same(a: &dyn Subscriber, b: &dyn Subscriber) -> bool {
  let same_addr = core::ptr::eq(a as *const _ as *const u8, b as *const _ as *const u8);
  // zero sized values may share an address, so also match the vtable
  same_addr && (core::mem::size_of_val(a) != 0 || core::ptr::eq(a, b))
}

impl<'a, I, E, D> Sx8634<'a, I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Receive every future interrupt through `subscriber`.
  pub fn subscribe(&mut self, subscriber: &'a dyn Subscriber) -> Result<(), Error<E>> {
    if self.notifier.register(subscriber) {
      Ok(())
    } else {
      Err(Error::SubscribersFull)
    }
  }

  /// Stop notifying `subscriber`. Returns `false` if it was not registered.
  pub fn unsubscribe(&mut self, subscriber: &dyn Subscriber) -> bool {
    self.notifier.unregister(subscriber)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mock::*;
  use crate::Reg;
  use core::cell::RefCell;
  use futures::executor::block_on;
  use std::vec::Vec;

  struct Log<'l> {
    name: char,
    seen: &'l RefCell<Vec<(char, u8, u16)>>,
  }

  impl Subscriber for Log<'_> {
    fn notify(&self, pending: InterruptSource, state: &State) {
      self.seen.borrow_mut().push((self.name, pending.into_bits(), state.cap_status()));
    }
  }

  #[test]
  fn subscribers_run_in_registration_order() {
    let seen = RefCell::new(Vec::new());
    let a = Log { name: 'a', seen: &seen };
    let b = Log { name: 'b', seen: &seen };

    let mut fake = FakeSx8634::new();
    fake.regs[Reg::IrqSrc as usize] = 0b0000_0100;
    fake.regs[Reg::CapStatLsb as usize] = 0x01;
    let mut dev = device(fake);
    dev.subscribe(&b).unwrap();
    dev.subscribe(&a).unwrap();

    block_on(dev.handle_interrupt(&mut RecordingInput::default()));
    assert_eq!(*seen.borrow(), [('b', 0b0000_0100, 0x0001), ('a', 0b0000_0100, 0x0001)]);
  }

  #[test]
  fn unsubscribe_stops_notifications() {
    let seen = RefCell::new(Vec::new());
    let a = Log { name: 'a', seen: &seen };
    let b = Log { name: 'b', seen: &seen };
    let c = Log { name: 'c', seen: &seen };

    let mut fake = FakeSx8634::new();
    fake.regs[Reg::IrqSrc as usize] = 0b1000_0000;
    let mut dev = device(fake);
    dev.subscribe(&a).unwrap();
    dev.subscribe(&b).unwrap();
    dev.subscribe(&c).unwrap();
    assert!(dev.unsubscribe(&a));
    assert!(!dev.unsubscribe(&a));

    block_on(dev.handle_interrupt(&mut RecordingInput::default()));
    let names: Vec<char> = seen.borrow().iter().map(|s| s.0).collect();
    assert_eq!(names, ['b', 'c']);
  }

  #[test]
  fn subscriber_capacity_is_bounded() {
    let seen = RefCell::new(Vec::new());
    let subs: Vec<Log> = "abcde".chars().map(|name| Log { name, seen: &seen }).collect();
    let mut dev = device(FakeSx8634::new());

    for s in &subs[..MAX_SUBSCRIBERS] {
      dev.subscribe(s).unwrap();
    }
    assert_eq!(dev.subscribe(&subs[MAX_SUBSCRIBERS]), Err(Error::SubscribersFull));

    assert!(dev.unsubscribe(&subs[1]));
    assert_eq!(dev.subscribe(&subs[MAX_SUBSCRIBERS]), Ok(()));
  }

  struct Backlight;
  struct Buzzer;

  impl Subscriber for Backlight {
    fn notify(&self, _: InterruptSource, _: &State) {}
  }

  impl Subscriber for Buzzer {
    fn notify(&self, _: InterruptSource, _: &State) {}
  }

  #[test]
  fn zero_sized_subscribers_at_one_address_stay_distinct() {
    // SAFETY: any aligned non-null pointer is valid for a zero sized type
    let backlight: &Backlight = unsafe { &*core::ptr::NonNull::dangling().as_ptr() };
    let buzzer: &Buzzer = unsafe { &*core::ptr::NonNull::dangling().as_ptr() };
    let mut dev = device(FakeSx8634::new());
    dev.subscribe(backlight).unwrap();
    dev.subscribe(buzzer).unwrap();

    assert!(dev.unsubscribe(buzzer));
    assert!(!dev.unsubscribe(buzzer));
    assert!(dev.unsubscribe(backlight));
  }

  #[test]
  fn no_notification_when_source_unreadable() {
    let seen = RefCell::new(Vec::new());
    let a = Log { name: 'a', seen: &seen };
    let mut fake = FakeSx8634::new();
    fake.fail_read = Some(Reg::IrqSrc.into());
    let mut dev = device(fake);
    dev.subscribe(&a).unwrap();

    assert!(block_on(dev.handle_interrupt(&mut RecordingInput::default())).is_none());
    assert!(seen.borrow().is_empty());
  }
}
