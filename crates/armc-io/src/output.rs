//! The verification output directory.
//!
//! Under the configured output directory, cleared at start:
//! `armc-input/` holds the rebound inputs and the serialised configuration,
//! `armc-loop-<k>/` the per-round iterates, abstractions and witnesses, and
//! `armc-counterexample/` the reconstructed trace on a violation.

use crate::config::{ArmcConfig, AutomataFormat, ImageFormat};
use crate::format::{self, MachineRef};
use crate::fsm;
use armc_abstraction::AbstractionSnapshot;
use armc_automata::{Sfa, Sft};
use armc_verify::{Counterexample, ProgressSink};
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Writes verification progress to the output directory; plugs into the
/// driver as its progress sink.
pub struct OutputWriter {
    root: PathBuf,
    format: AutomataFormat,
    image: Option<ImageFormat>,
    print_automata: bool,
    config_text: String,
    loop_dir: PathBuf,
}

impl OutputWriter {
    /// Clear and recreate the output directory.
    pub fn new(config: &ArmcConfig) -> io::Result<Self> {
        let root = config.output_directory.clone();
        if root.exists() {
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        Ok(OutputWriter {
            loop_dir: root.clone(),
            root,
            format: config.automata_format,
            image: config.image_format,
            print_automata: config.print_automata,
            config_text: config.to_properties(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn counterexample_dir(&self) -> PathBuf {
        self.root.join("armc-counterexample")
    }

    fn write_machine(&self, dir: &Path, stem: &str, machine: MachineRef<'_>) -> io::Result<()> {
        if !self.print_automata {
            return Ok(());
        }
        let path = dir.join(format!("{stem}.{}", self.format.extension()));
        fs::write(&path, format::render(machine, self.format))?;
        if self.format == AutomataFormat::Fsm {
            let algebra = match machine {
                MachineRef::Automaton(m) => m.algebra(),
                MachineRef::Transducer(t) => t.algebra(),
            };
            let symbols = fsm::render_symbols(algebra);
            fs::write(dir.join(format!("{stem}.isym")), &symbols)?;
            fs::write(dir.join(format!("{stem}.osym")), &symbols)?;
        }
        if let Some(image) = self.image {
            self.rasterise(dir, stem, machine, image)?;
        }
        Ok(())
    }

    /// Pipe the DOT rendition through an external `dot` process.
    fn rasterise(
        &self,
        dir: &Path,
        stem: &str,
        machine: MachineRef<'_>,
        image: ImageFormat,
    ) -> io::Result<()> {
        let text = format::render(machine, AutomataFormat::Dot);
        let target = dir.join(format!("{stem}.{}", image.as_str()));
        debug!(target = %target.display(), "rendering image");
        let mut child = Command::new("dot")
            .arg(format!("-T{}", image.as_str()))
            .arg("-o")
            .arg(&target)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(text.as_bytes())?;
        }
        let status = child.wait()?;
        if !status.success() {
            return Err(io::Error::other(format!(
                "dot failed for {}",
                target.display()
            )));
        }
        Ok(())
    }
}

impl ProgressSink for OutputWriter {
    fn on_inputs(&mut self, init: &Sfa, bad: &Sfa, tau: &Sft) -> io::Result<()> {
        let dir = self.root.join("armc-input");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("config.properties"), &self.config_text)?;
        self.write_machine(&dir, "init", MachineRef::Automaton(init))?;
        self.write_machine(&dir, "bad", MachineRef::Automaton(bad))?;
        self.write_machine(&dir, "tau", MachineRef::Transducer(tau))
    }

    fn on_loop_begin(&mut self, loop_index: usize) -> io::Result<()> {
        self.loop_dir = self.root.join(format!("armc-loop-{loop_index}"));
        fs::create_dir_all(&self.loop_dir)
    }

    fn on_step(&mut self, index: usize, m: &Sfa, m_abs: &Sfa) -> io::Result<()> {
        let dir = self.loop_dir.clone();
        self.write_machine(&dir, &format!("m-{index}"), MachineRef::Automaton(m))?;
        self.write_machine(&dir, &format!("m-{index}+"), MachineRef::Automaton(m_abs))
    }

    fn on_witness(&mut self, index: usize, x: &Sfa) -> io::Result<()> {
        let dir = self.loop_dir.clone();
        self.write_machine(&dir, &format!("x-{index}"), MachineRef::Automaton(x))
    }

    fn on_abstraction(&mut self, snapshot: &AbstractionSnapshot) -> io::Result<()> {
        match snapshot {
            AbstractionSnapshot::PredicateAutomata(predicates) => {
                let dir = self.loop_dir.clone();
                for (index, p) in predicates.iter().enumerate() {
                    self.write_machine(
                        &dir,
                        &format!("predicate-{index}"),
                        MachineRef::Automaton(p),
                    )?;
                }
                Ok(())
            }
            AbstractionSnapshot::Bound(bound) => {
                fs::write(self.loop_dir.join("bound.txt"), format!("{bound}\n"))
            }
        }
    }

    fn on_counterexample(&mut self, counterexample: &Counterexample) -> io::Result<()> {
        let dir = self.counterexample_dir();
        fs::create_dir_all(&dir)?;
        for (index, step) in counterexample.steps.iter().enumerate() {
            self.write_machine(&dir, &format!("m-{index}"), MachineRef::Automaton(&step.reachable))?;
            if let Some(abstracted) = &step.abstracted {
                self.write_machine(
                    &dir,
                    &format!("m-{index}+"),
                    MachineRef::Automaton(abstracted),
                )?;
            }
            self.write_machine(&dir, &format!("x-{index}"), MachineRef::Automaton(&step.witness))?;
        }
        Ok(())
    }
}
