use std::{io, sync::Arc, thread};

use crossbeam_channel::{bounded, Receiver, SendError};

pub trait Worker<T>
where
    T: Send,
    Self: Sized + Send + Sync,
{
    fn proc(&self, input: T);

    fn para<I>(self, in_v: I) -> io::Result<Arc<Self>>
    where
        I: Iterator<Item = T>,
    {
        let arced_self = Arc::new(self);
        para_run::<Self, T, _>(in_v, arced_self.clone())?;
        Ok(arced_self)
    }

    fn para_with<I>(self, in_v: I, n_threads: usize) -> io::Result<Arc<Self>>
    where
        I: Iterator<Item = T>,
    {
        let arced_self = Arc::new(self);
        para_run_with::<Self, T, _>(in_v, arced_self.clone(), n_threads)?;
        Ok(arced_self)
    }
}

pub enum QueIn<T> {
    Go(T),
    Poison,
}

pub fn para_run<W, T, I>(in_v: I, setup: Arc<W>) -> io::Result<()>
where
    W: Worker<T>,
    I: Iterator<Item = T>,
    T: Send,
{
    let n_threads: usize = thread::available_parallelism()?.into();
    para_run_with(in_v, setup, n_threads)
}

pub fn para_run_with<W, T, I>(in_v: I, setup: Arc<W>, n_threads: usize) -> io::Result<()>
where
    W: Worker<T>,
    I: Iterator<Item = T>,
    T: Send,
{
    let n_threads = n_threads.max(1);
    let capacity = n_threads * 100;

    let (sender, r) = bounded(capacity);

    thread::scope(|s| {
        for _ in 0..(n_threads) {
            let in_clone = r.clone();
            let s_clone = setup.clone();
            s.spawn(move || subf::<W, _>(in_clone, s_clone));
        }
        //workers hold the only receivers now, a dead pool surfaces as a send error
        drop(r);

        for e in in_v {
            sender.send(QueIn::Go(e)).map_err(disconnected)?;
        }
        for _ in 0..(n_threads) {
            sender.send(QueIn::Poison).map_err(disconnected)?;
        }
        Ok(())
    })
}

fn subf<W, T>(r: Receiver<QueIn<T>>, s: Arc<W>)
where
    W: Worker<T>,
    T: Send,
{
    while let Ok(QueIn::Go(e)) = r.recv() {
        s.proc(e);
    }
}

fn disconnected<T>(_: SendError<T>) -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "worker pool hung up")
}
